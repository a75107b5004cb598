use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Datelike;
use rollcall_core::AppError;
use rollcall_models::Weekday;
use tracing::instrument;

use super::model::{CreateTeacherDto, Teacher, TodayClass, TodayClassesQuery, UpdateTeacherDto};
use super::service::TeacherService;
use crate::middleware::role::RequireTeacher;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::MessageResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a teacher with class and subject assignments
#[utoipa::path(
    post,
    path = "/api/admin/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher created", body = Teacher),
        (status = 400, description = "Duplicate SAP ID or unknown class/subject", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, dto))]
pub async fn create_teacher(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = TeacherService::create_teacher(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/admin/teachers",
    responses(
        (status = 200, description = "All teachers", body = Vec<Teacher>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn list_teachers(State(state): State<AppState>) -> Result<Json<Vec<Teacher>>, AppError> {
    Ok(Json(TeacherService::list_teachers(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/teachers/{sap_id}",
    params(("sap_id" = String, Path, description = "Teacher SAP ID")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::get_teacher(&state.db, &sap_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/teachers/{sap_id}",
    params(("sap_id" = String, Path, description = "Teacher SAP ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 400, description = "Unknown class or subject", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, dto))]
pub async fn update_teacher(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherDto>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::update_teacher(&state.db, &sap_id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/teachers/{sap_id}",
    params(("sap_id" = String, Path, description = "Teacher SAP ID")),
    responses(
        (status = 200, description = "Teacher deleted", body = MessageResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    TeacherService::delete_teacher(&state.db, &sap_id).await?;
    Ok(Json(MessageResponse::new("Teacher deleted successfully")))
}

/// Classes the signed-in teacher takes today, with rosters
#[utoipa::path(
    get,
    path = "/api/teacher/today-classes",
    params(TodayClassesQuery),
    responses(
        (status = 200, description = "Today's slots ordered by start time", body = Vec<TodayClass>),
        (status = 400, description = "Invalid day", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - teacher only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Teachers"
)]
#[instrument(skip(state, auth_user))]
pub async fn today_classes(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Query(query): Query<TodayClassesQuery>,
) -> Result<Json<Vec<TodayClass>>, AppError> {
    let day = match query.day.as_deref() {
        Some(label) => label.parse::<Weekday>().map_err(AppError::bad_request)?,
        None => Weekday::from(chrono::Local::now().weekday()),
    };

    let classes = TeacherService::today_classes(&state.db, auth_user.user_id()?, day).await?;
    Ok(Json(classes))
}
