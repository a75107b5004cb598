mod common;

use axum::http::StatusCode;
use common::{body_json, create_admin, get_request, json_request, login, send, test_app};
use serde_json::json;
use sqlx::PgPool;

async fn setup(pool: &PgPool) -> (axum::Router, String) {
    create_admin(pool, "admin", "admin-pass").await;
    let app = test_app(pool.clone());
    let token = login(&app, "admin", "admin-pass").await;

    for (name, batch) in [("SE-IT-A", "morning"), ("SE-IT-B", "evening")] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/admin/classes",
                Some(&token),
                &json!({ "year": "2023", "name": name, "batch": batch }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    (app, token)
}

async fn create_student(app: &axum::Router, token: &str, sap_id: &str, class_key: &str) -> StatusCode {
    send(
        app,
        json_request(
            "POST",
            "/api/admin/students",
            Some(token),
            &json!({ "name": format!("Student {}", sap_id), "sap_id": sap_id, "class_key": class_key }),
        ),
    )
    .await
    .status()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_students_filters_and_paginates(pool: PgPool) {
    let (app, token) = setup(&pool).await;

    for i in 0..3 {
        let status = create_student(&app, &token, &format!("A{:03}", i), "2023-SE-IT-A-morning").await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let status = create_student(&app, &token, "B001", "2023-SE-IT-B-evening").await;
    assert_eq!(status, StatusCode::CREATED);

    let response = send(
        &app,
        get_request(
            "/api/admin/students?class_key=2023-SE-IT-A-morning&limit=2&page=1",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["has_more"], true);

    let response = send(&app, get_request("/api/admin/students", Some(&token))).await;
    assert_eq!(body_json(response).await["meta"]["total"], 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_sap_id_is_rejected(pool: PgPool) {
    let (app, token) = setup(&pool).await;

    assert_eq!(
        create_student(&app, &token, "S100", "2023-SE-IT-A-morning").await,
        StatusCode::CREATED
    );
    assert_eq!(
        create_student(&app, &token, "S100", "2023-SE-IT-B-evening").await,
        StatusCode::BAD_REQUEST
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_class_is_rejected(pool: PgPool) {
    let (app, token) = setup(&pool).await;

    assert_eq!(
        create_student(&app, &token, "S200", "2030-NOPE-Z-morning").await,
        StatusCode::BAD_REQUEST
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_profile_and_missing_student(pool: PgPool) {
    let (app, token) = setup(&pool).await;
    create_student(&app, &token, "S300", "2023-SE-IT-A-morning").await;

    let response = send(&app, get_request("/api/admin/students/S300", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["class_key"], "2023-SE-IT-A-morning");

    let response = send(&app, get_request("/api/admin/students/NOPE", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let student = login(&app, "S300", "S300").await;
    let me = send(&app, get_request("/api/auth/me", Some(&student))).await;
    assert_eq!(body_json(me).await["class_key"], "2023-SE-IT-A-morning");
}
