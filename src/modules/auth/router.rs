use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use rollcall_config::RateLimitConfig;
use tower_governor::GovernorLayer;

use super::controller::{change_password, get_me, login_user};
use crate::state::AppState;

pub fn init_auth_router(rate_limit_config: &RateLimitConfig) -> Router<AppState> {
    let login = match rate_limit_config.auth_governor_config() {
        Some(config) => Router::new()
            .route("/login", post(login_user))
            .layer(GovernorLayer::new(Arc::new(config))),
        None => Router::new().route("/login", post(login_user)),
    };

    Router::new()
        .merge(login)
        .route("/me", get(get_me))
        .route("/change-password", post(change_password))
}
