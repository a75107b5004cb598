mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDate, Utc};
use common::{
    body_json, create_admin, get_request, json_request, lazy_pool, login, send, test_app,
    token_for,
};
use serde_json::json;
use sqlx::PgPool;

const CLASS: &str = "2023-SE-IT-A-morning";
const BOUNDARY: &str = "rollcall-test-boundary";

fn multipart_body(fields: &[(&str, &str)], letter: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, content)) = letter {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"letter\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn ticket_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/student/tickets")
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_ticket_requires_multipart() {
    let app = test_app(lazy_pool());
    let student = token_for("student");

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/student/tickets",
            Some(&student),
            &json!({ "subject": "Mathematics" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_teacher_cannot_raise_ticket() {
    let app = test_app(lazy_pool());
    let teacher = token_for("teacher");

    let response = send(
        &app,
        ticket_request(&teacher, multipart_body(&[("subject", "Mathematics")], None)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

async fn setup(pool: &PgPool) -> axum::Router {
    create_admin(pool, "admin", "admin-pass").await;
    let app = test_app(pool.clone());
    let admin = login(&app, "admin", "admin-pass").await;

    for (uri, body) in [
        (
            "/api/admin/classes",
            json!({ "year": "2023", "name": "SE-IT-A", "batch": "morning" }),
        ),
        (
            "/api/admin/subjects",
            json!({
                "name": "Mathematics",
                "classes": [CLASS],
                "timings": [{ "days": ["Mon"], "time": { "start": "09:00", "end": "10:00" } }]
            }),
        ),
        (
            "/api/admin/teachers",
            json!({
                "name": "Ada Teacher",
                "sap_id": "T100",
                "classes": [CLASS],
                "subjects": ["Mathematics"]
            }),
        ),
        (
            "/api/admin/students",
            json!({ "name": "Sam Student", "sap_id": "S001", "class_key": CLASS }),
        ),
    ] {
        let response = send(&app, json_request("POST", uri, Some(&admin), &body)).await;
        assert_eq!(response.status(), StatusCode::CREATED, "{}", uri);
    }

    app
}

async fn record_session(pool: &PgPool, date: NaiveDate) {
    sqlx::query(
        r#"
        INSERT INTO attendance_sessions (class_id, subject_id, session_date, class_end_time)
        SELECT c.id, s.id, $1, $2
        FROM class_sections c, subjects s
        WHERE c.full_name = $3 AND s.name = 'Mathematics'
        "#,
    )
    .bind(date)
    .bind(Utc::now() - Duration::days(2))
    .bind(CLASS)
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_ticket_flow(pool: PgPool) {
    let app = setup(&pool).await;
    record_session(&pool, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()).await;
    let student = login(&app, "S001", "S001").await;
    let teacher = login(&app, "T100", "T100").await;

    let response = send(
        &app,
        ticket_request(
            &student,
            multipart_body(
                &[
                    ("subject", "Mathematics"),
                    ("reason", "I was at the hospital"),
                    ("date", "03-03-2025"),
                ],
                Some(("note.pdf", "application/pdf", b"%PDF-1.4 test")),
            ),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["message"], "Request submitted successfully");
    assert_eq!(created["notified"], false);
    assert_eq!(created["ticket"]["teacher_name"], "Ada Teacher");
    assert_eq!(created["ticket"]["file_name"], "note.pdf");
    assert_eq!(created["ticket"]["status"], "pending");
    let ticket_id = created["ticket"]["id"].as_str().unwrap().to_string();

    let inbox = send(
        &app,
        get_request("/api/teacher/tickets?status=pending", Some(&teacher)),
    )
    .await;
    assert_eq!(inbox.status(), StatusCode::OK);
    assert_eq!(body_json(inbox).await.as_array().unwrap().len(), 1);

    let pending = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/teacher/tickets/{}", ticket_id),
            Some(&teacher),
            &json!({ "status": "pending" }),
        ),
    )
    .await;
    assert_eq!(pending.status(), StatusCode::BAD_REQUEST);

    let approved = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/teacher/tickets/{}", ticket_id),
            Some(&teacher),
            &json!({ "status": "approved" }),
        ),
    )
    .await;
    assert_eq!(approved.status(), StatusCode::OK);
    assert_eq!(body_json(approved).await["status"], "approved");

    let mine = send(&app, get_request("/api/student/tickets", Some(&student))).await;
    assert_eq!(body_json(mine).await[0]["status"], "approved");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_ticket_needs_a_recorded_session(pool: PgPool) {
    let app = setup(&pool).await;
    let student = login(&app, "S001", "S001").await;

    let response = send(
        &app,
        ticket_request(
            &student,
            multipart_body(
                &[
                    ("subject", "Mathematics"),
                    ("reason", "Marked absent by mistake"),
                    ("date", "04-03-2025"),
                ],
                None,
            ),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "No attendance was taken for Mathematics on 04-03-2025"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_ticket_rejects_missing_reason(pool: PgPool) {
    let app = setup(&pool).await;
    let student = login(&app, "S001", "S001").await;

    let response = send(
        &app,
        ticket_request(
            &student,
            multipart_body(&[("subject", "Mathematics"), ("date", "03-03-2025")], None),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "reason is required");
}
