use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch},
};
use rollcall_config::UploadConfig;

use super::controller::{create_ticket, my_tickets, teacher_tickets, update_ticket_status};
use crate::state::AppState;

/// Student routes, merged into `/api/student`. The body limit covers the
/// attachment plus the text fields.
pub fn init_student_tickets_router(upload_config: &UploadConfig) -> Router<AppState> {
    Router::new().route(
        "/tickets",
        get(my_tickets)
            .post(create_ticket)
            .layer(DefaultBodyLimit::max(upload_config.body_limit())),
    )
}

/// Teacher routes, merged into `/api/teacher`.
pub fn init_teacher_tickets_router() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(teacher_tickets))
        .route("/tickets/{id}", patch(update_ticket_status))
}
