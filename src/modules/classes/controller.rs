use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rollcall_core::AppError;
use tracing::instrument;

use super::model::{ClassSection, CreateClassDto, UpdateClassDto};
use super::service::ClassService;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::MessageResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/admin/classes",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = ClassSection),
        (status = 400, description = "Class already exists", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Classes"
)]
#[instrument(skip(state, dto))]
pub async fn create_class(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<ClassSection>), AppError> {
    let class = ClassService::create_class(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    get,
    path = "/api/admin/classes",
    responses(
        (status = 200, description = "All classes", body = Vec<ClassSection>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Classes"
)]
#[instrument(skip(state))]
pub async fn list_classes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClassSection>>, AppError> {
    Ok(Json(ClassService::list_classes(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/classes/{key}",
    params(("key" = String, Path, description = "Class key, e.g. 2023-SE-IT-A-morning")),
    responses(
        (status = 200, description = "Class", body = ClassSection),
        (status = 404, description = "Class not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Classes"
)]
#[instrument(skip(state))]
pub async fn get_class(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ClassSection>, AppError> {
    Ok(Json(ClassService::get_class(&state.db, &key).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/classes/{key}",
    params(("key" = String, Path, description = "Class key")),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated", body = ClassSection),
        (status = 400, description = "Resulting key already exists", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Classes"
)]
#[instrument(skip(state, dto))]
pub async fn update_class(
    State(state): State<AppState>,
    Path(key): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateClassDto>,
) -> Result<Json<ClassSection>, AppError> {
    Ok(Json(ClassService::update_class(&state.db, &key, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/classes/{key}",
    params(("key" = String, Path, description = "Class key")),
    responses(
        (status = 200, description = "Class deleted", body = MessageResponse),
        (status = 400, description = "Class still has students or subjects", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Classes"
)]
#[instrument(skip(state))]
pub async fn delete_class(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    ClassService::delete_class(&state.db, &key).await?;
    Ok(Json(MessageResponse::new("Class deleted successfully")))
}
