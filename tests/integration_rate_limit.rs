mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{lazy_pool, send};
use rollcall::rollcall_config::RateLimitConfig;
use rollcall::router::init_router;
use rollcall::state::AppState;
use serde_json::json;

fn app_with_rate_limit(rate_limit_config: RateLimitConfig) -> axum::Router {
    let mut state = AppState::for_tests(lazy_pool());
    state.rate_limit_config = rate_limit_config;
    init_router(state)
}

/// One request per client, refilled once a minute.
fn strict_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        auth_per_second: 60,
        auth_burst_size: 1,
    }
}

// An empty SAP ID fails validation before any database access, so these
// requests exercise only the limiter.
fn login_request(ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(
            serde_json::to_string(&json!({ "sap_id": "", "password": "password123" })).unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_auth_rate_limit_exceeded() {
    let app = app_with_rate_limit(strict_rate_limit_config());

    let first = send(&app, login_request("192.168.1.100")).await;
    assert_eq!(first.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let second = send(&app, login_request("192.168.1.100")).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_is_per_client_ip() {
    let app = app_with_rate_limit(strict_rate_limit_config());

    let first = send(&app, login_request("10.0.0.1")).await;
    assert_eq!(first.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let other_client = send(&app, login_request("10.0.0.2")).await;
    assert_eq!(other_client.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let app = app_with_rate_limit(RateLimitConfig::disabled());

    for _ in 0..5 {
        let response = send(&app, login_request("192.168.1.100")).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn test_rate_limit_only_applies_to_login() {
    let app = app_with_rate_limit(strict_rate_limit_config());

    for _ in 0..3 {
        let response = send(&app, common::get_request("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
