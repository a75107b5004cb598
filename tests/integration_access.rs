mod common;

use axum::http::StatusCode;
use common::{body_json, get_request, json_request, lazy_pool, send, test_app, token_for};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = test_app(lazy_pool());

    let response = send(&app, get_request("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_openapi_document_lists_attendance_routes() {
    let app = test_app(lazy_pool());

    let response = send(&app, get_request("/api-docs/openapi.json", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/teacher/attendance"].is_object());
    assert!(doc["paths"]["/api/admin/subjects"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app(lazy_pool());

    for uri in [
        "/api/admin/classes",
        "/api/teacher/today-classes",
        "/api/student/subjects",
        "/api/auth/me",
    ] {
        let response = send(&app, get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = test_app(lazy_pool());

    let response = send(&app, get_request("/api/admin/classes", Some("not-a-jwt"))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid or expired token"
    );
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let app = test_app(lazy_pool());
    let teacher = token_for("teacher");
    let student = token_for("student");
    let admin = token_for("admin");

    let cases = [
        ("/api/admin/classes", &teacher),
        ("/api/admin/students", &student),
        ("/api/teacher/today-classes", &student),
        ("/api/teacher/attendance/history", &admin),
        ("/api/student/attendance-report", &teacher),
        ("/api/student/tickets", &admin),
    ];

    for (uri, token) in cases {
        let response = send(&app, get_request(uri, Some(token))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn test_login_requires_sap_id() {
    let app = test_app(lazy_pool());

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "sap_id": "", "password": "secret" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "SAP ID is required");
}

#[tokio::test]
async fn test_login_missing_field_is_bad_request() {
    let app = test_app(lazy_pool());

    let response = send(
        &app,
        json_request("POST", "/api/auth/login", None, &json!({ "sap_id": "admin" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "password is required");
}

#[tokio::test]
async fn test_subject_without_classes_is_rejected() {
    let app = test_app(lazy_pool());
    let admin = token_for("admin");

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/admin/subjects",
            Some(&admin),
            &json!({
                "name": "Mathematics",
                "classes": [],
                "timings": [{ "days": ["Mon"], "time": { "start": "09:00", "end": "10:00" } }]
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await["error"],
        "At least one class is required"
    );
}

#[tokio::test]
async fn test_attendance_without_students_is_rejected() {
    let app = test_app(lazy_pool());
    let teacher = token_for("teacher");

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/teacher/attendance",
            Some(&teacher),
            &json!({
                "class_key": "2023-SE-IT-A-morning",
                "subject": "Mathematics",
                "date": "2025-03-03",
                "class_end_time": "2025-03-03T10:00:00Z",
                "students": []
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await["error"],
        "At least one student entry is required"
    );
}

#[tokio::test]
async fn test_today_classes_rejects_unknown_day() {
    let app = test_app(lazy_pool());
    let teacher = token_for("teacher");

    let response = send(
        &app,
        get_request("/api/teacher/today-classes?day=Funday", Some(&teacher)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid day 'Funday'. Use Mon, Tue, Wed, Thu, Fri, Sat or Sun"
    );
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app(lazy_pool());

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let generated = send(&app, get_request("/health", None)).await;
    assert!(generated.headers().contains_key("x-request-id"));
}
