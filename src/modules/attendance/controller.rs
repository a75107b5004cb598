use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use rollcall_core::AppError;
use tracing::instrument;

use super::model::{
    AttendanceSession, HistoryQuery, MarkAttendanceDto, MarkAttendanceResponse, SessionQuery,
    SessionSummary, export_csv,
};
use super::service::AttendanceService;
use crate::middleware::role::RequireTeacher;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Mark or update attendance for a class, subject and date
///
/// A new session is always accepted. An existing one can only be changed
/// within 12 hours of the class end time recorded when it was created.
#[utoipa::path(
    post,
    path = "/api/teacher/attendance",
    request_body = MarkAttendanceDto,
    responses(
        (status = 201, description = "Session created", body = MarkAttendanceResponse),
        (status = 200, description = "Session updated", body = MarkAttendanceResponse),
        (status = 400, description = "Duplicate or unknown students", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not assigned, or edit window closed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    ValidatedJson(dto): ValidatedJson<MarkAttendanceDto>,
) -> Result<(StatusCode, Json<MarkAttendanceResponse>), AppError> {
    let response = AttendanceService::mark_attendance(&state.db, auth_user.user_id()?, dto).await?;
    let status = if response.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/teacher/attendance",
    params(SessionQuery),
    responses(
        (status = 200, description = "Attendance session", body = AttendanceSession),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 403, description = "Not assigned to this class and subject", body = ErrorResponse),
        (status = 404, description = "No attendance recorded", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state, auth_user))]
pub async fn get_attendance(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Query(query): Query<SessionQuery>,
) -> Result<Json<AttendanceSession>, AppError> {
    let session = AttendanceService::get_session(
        &state.db,
        auth_user.user_id()?,
        &query.class_key,
        &query.subject,
        &query.date,
    )
    .await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/api/teacher/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Sessions with present/total counts", body = Vec<SessionSummary>),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state, auth_user))]
pub async fn attendance_history(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let sessions = AttendanceService::history(&state.db, auth_user.user_id()?, &query).await?;
    Ok(Json(sessions))
}

/// Download attendance as CSV
#[utoipa::path(
    get,
    path = "/api/teacher/attendance/export",
    params(HistoryQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(state, auth_user))]
pub async fn export_attendance(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = AttendanceService::export_rows(&state.db, auth_user.user_id()?, &query).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance.csv\"",
            ),
        ],
        export_csv(&rows),
    ))
}
