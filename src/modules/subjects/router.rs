use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_subject, delete_subject, get_subject, list_subjects, update_subject,
};
use crate::state::AppState;

pub fn init_subjects_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subject).get(list_subjects))
        .route(
            "/{name}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
}
