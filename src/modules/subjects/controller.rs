use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rollcall_core::AppError;
use tracing::instrument;

use super::model::{CreateSubjectDto, Subject, UpdateSubjectDto};
use super::service::SubjectService;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::MessageResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Create a subject after checking its timings for conflicts
#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    request_body = CreateSubjectDto,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Duplicate name, unknown class, invalid timing or schedule conflict", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
#[instrument(skip(state, dto))]
pub async fn create_subject(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateSubjectDto>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    let subject = SubjectService::create_subject(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    get,
    path = "/api/admin/subjects",
    responses(
        (status = 200, description = "All subjects with classes and timings", body = Vec<Subject>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
#[instrument(skip(state))]
pub async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, AppError> {
    Ok(Json(SubjectService::list_subjects(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/subjects/{name}",
    params(("name" = String, Path, description = "Subject name")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
#[instrument(skip(state))]
pub async fn get_subject(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Subject>, AppError> {
    Ok(Json(SubjectService::get_subject(&state.db, &name).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/subjects/{name}",
    params(("name" = String, Path, description = "Subject name")),
    request_body = UpdateSubjectDto,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 400, description = "Duplicate name, unknown class, invalid timing or schedule conflict", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
#[instrument(skip(state, dto))]
pub async fn update_subject(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateSubjectDto>,
) -> Result<Json<Subject>, AppError> {
    Ok(Json(SubjectService::update_subject(&state.db, &name, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{name}",
    params(("name" = String, Path, description = "Subject name")),
    responses(
        (status = 200, description = "Subject deleted", body = MessageResponse),
        (status = 400, description = "Subject is still referenced", body = ErrorResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Subjects"
)]
#[instrument(skip(state))]
pub async fn delete_subject(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    SubjectService::delete_subject(&state.db, &name).await?;
    Ok(Json(MessageResponse::new("Subject deleted successfully")))
}
