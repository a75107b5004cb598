use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_teacher, delete_teacher, get_teacher, list_teachers, update_teacher,
};
use crate::state::AppState;

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_teacher).get(list_teachers))
        .route(
            "/{sap_id}",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
}
