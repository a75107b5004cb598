use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_student, delete_student, get_student, list_students, my_attendance,
    my_attendance_report, my_subject_report, my_subjects, update_student,
};
use crate::state::AppState;

/// Admin management routes, nested under `/api/admin/students`.
pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student).get(list_students))
        .route(
            "/{sap_id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}

/// Self-service routes, merged into `/api/student`.
pub fn init_student_portal_router() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(my_attendance))
        .route("/attendance-report", get(my_attendance_report))
        .route("/attendance-report/{subject}", get(my_subject_report))
        .route("/subjects", get(my_subjects))
}
