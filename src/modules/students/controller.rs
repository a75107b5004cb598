use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rollcall_core::{AppError, PaginationParams};
use tracing::instrument;

use super::model::{
    AttendanceReport, CreateStudentDto, DateQuery, DateRangeQuery, PaginatedStudentsResponse,
    Student, StudentAttendanceRecord, StudentFilter, StudentSubject, SubjectAttendanceReport,
    UpdateStudentDto,
};
use super::service::StudentService;
use crate::middleware::role::RequireStudent;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::MessageResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Enrol a student in a class section
#[utoipa::path(
    post,
    path = "/api/admin/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 400, description = "Duplicate SAP ID or unknown class", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = StudentService::create_student(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// List students with optional class filter and pagination
#[utoipa::path(
    get,
    path = "/api/admin/students",
    params(StudentFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of students", body = PaginatedStudentsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    Query(filter): Query<StudentFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let students = StudentService::list_students(&state.db, filter, pagination).await?;
    Ok(Json(students))
}

#[utoipa::path(
    get,
    path = "/api/admin/students/{sap_id}",
    params(("sap_id" = String, Path, description = "Student SAP ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(StudentService::get_student(&state.db, &sap_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/students/{sap_id}",
    params(("sap_id" = String, Path, description = "Student SAP ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Unknown class", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(StudentService::update_student(&state.db, &sap_id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/students/{sap_id}",
    params(("sap_id" = String, Path, description = "Student SAP ID")),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(sap_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    StudentService::delete_student(&state.db, &sap_id).await?;
    Ok(Json(MessageResponse::new("Student deleted successfully")))
}

/// Own attendance on one day
#[utoipa::path(
    get,
    path = "/api/student/attendance",
    params(DateQuery),
    responses(
        (status = 200, description = "Records for the day", body = Vec<StudentAttendanceRecord>),
        (status = 400, description = "Invalid date", body = ErrorResponse),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, auth_user))]
pub async fn my_attendance(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<StudentAttendanceRecord>>, AppError> {
    let records = StudentService::attendance_on(&state.db, auth_user.sap_id(), &query.date).await?;
    Ok(Json(records))
}

/// Own attendance in a date range, with a summary
#[utoipa::path(
    get,
    path = "/api/student/attendance-report",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Records and summary", body = AttendanceReport),
        (status = 400, description = "Invalid date range", body = ErrorResponse),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, auth_user))]
pub async fn my_attendance_report(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<AttendanceReport>, AppError> {
    let report = StudentService::attendance_report(
        &state.db,
        auth_user.sap_id(),
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )
    .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/student/attendance-report/{subject}",
    params(
        ("subject" = String, Path, description = "Subject name"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Subject records and summary", body = SubjectAttendanceReport),
        (status = 400, description = "Invalid date range", body = ErrorResponse),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, auth_user))]
pub async fn my_subject_report(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    Path(subject): Path<String>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<SubjectAttendanceReport>, AppError> {
    let report = StudentService::subject_report(
        &state.db,
        auth_user.sap_id(),
        &subject,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )
    .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/student/subjects",
    responses(
        (status = 200, description = "Subjects of the student's class", body = Vec<StudentSubject>),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, auth_user))]
pub async fn my_subjects(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Vec<StudentSubject>>, AppError> {
    let subjects = StudentService::my_subjects(&state.db, auth_user.user_id()?).await?;
    Ok(Json(subjects))
}
