use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::{require_admin, require_student, require_teacher};
use crate::modules::attendance::init_attendance_router;
use crate::modules::auth::init_auth_router;
use crate::modules::classes::init_classes_router;
use crate::modules::students::{init_student_portal_router, init_students_router};
use crate::modules::subjects::init_subjects_router;
use crate::modules::teachers::controller::today_classes;
use crate::modules::teachers::init_teachers_router;
use crate::modules::tickets::{init_student_tickets_router, init_teacher_tickets_router};
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/classes", init_classes_router())
        .nest("/subjects", init_subjects_router())
        .nest("/teachers", init_teachers_router())
        .nest("/students", init_students_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

fn teacher_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/today-classes", get(today_classes))
        .nest("/attendance", init_attendance_router())
        .merge(init_teacher_tickets_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_teacher))
}

fn student_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(init_student_portal_router())
        .merge(init_student_tickets_router(&state.upload_config))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_student))
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router(&state.rate_limit_config))
                .nest("/admin", admin_router(&state))
                .nest("/teacher", teacher_router(&state))
                .nest("/student", student_router(&state)),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
