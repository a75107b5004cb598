use axum::{Router, routing::get};

use super::controller::{attendance_history, export_attendance, get_attendance, mark_attendance};
use crate::state::AppState;

pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_attendance).post(mark_attendance))
        .route("/history", get(attendance_history))
        .route("/export", get(export_attendance))
}
