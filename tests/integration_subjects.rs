mod common;

use axum::http::StatusCode;
use common::{body_json, create_admin, get_request, json_request, login, send, test_app};
use serde_json::{Value, json};
use sqlx::PgPool;

const CLASS: &str = "2023-SE-IT-A-morning";
const OTHER_CLASS: &str = "2023-SE-IT-B-morning";

async fn setup(pool: PgPool) -> (axum::Router, String) {
    create_admin(&pool, "admin", "admin-pass").await;
    let app = test_app(pool);
    let token = login(&app, "admin", "admin-pass").await;

    for name in ["SE-IT-A", "SE-IT-B"] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/admin/classes",
                Some(&token),
                &json!({ "year": "2023", "name": name, "batch": "morning", "num_students": 60 }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    (app, token)
}

async fn update_subject(
    app: &axum::Router,
    token: &str,
    name: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let response = send(
        app,
        json_request("PUT", &format!("/api/admin/subjects/{}", name), Some(token), body),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

fn slot(day: &str, start: &str, end: &str) -> Value {
    json!([{ "days": [day], "time": { "start": start, "end": end } }])
}

fn subject(name: &str, timings: Value) -> Value {
    json!({ "name": name, "classes": [CLASS], "timings": timings })
}

async fn create_subject(app: &axum::Router, token: &str, body: &Value) -> (StatusCode, Value) {
    let response = send(
        app,
        json_request("POST", "/api/admin/subjects", Some(token), body),
    )
    .await;
    let status = response.status();
    (status, body_json(response).await)
}

#[sqlx::test(migrations = "./migrations")]
async fn test_class_conflict_names_the_other_subject(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, created) = create_subject(
        &app,
        &token,
        &subject(
            "Mathematics",
            json!([{ "days": ["Mon", "Wed"], "time": { "start": "09:00", "end": "10:30" } }]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["classes"], json!([CLASS]));

    let (status, body) = create_subject(
        &app,
        &token,
        &subject(
            "Physics",
            json!([{ "days": ["Wed", "Fri"], "time": { "start": "10:00", "end": "11:00" } }]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Conflict in 2023-SE-IT-A-morning: Timing overlaps on Wed with Mathematics"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_touching_slots_and_other_days_are_allowed(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, _) = create_subject(
        &app,
        &token,
        &subject(
            "Mathematics",
            json!([{ "days": ["Mon"], "time": { "start": "09:00", "end": "10:00" } }]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = create_subject(
        &app,
        &token,
        &subject(
            "Physics",
            json!([
                { "days": ["Mon"], "time": { "start": "10:00", "end": "11:00" } },
                { "days": ["Tue"], "time": { "start": "09:00", "end": "10:00" } }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let list = send(&app, get_request("/api/admin/subjects", Some(&token))).await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_internal_overlap_is_rejected(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, body) = create_subject(
        &app,
        &token,
        &subject(
            "Chemistry",
            json!([
                { "days": ["Mon", "Thu"], "time": { "start": "09:00", "end": "10:00" } },
                { "days": ["Thu"], "time": { "start": "09:30", "end": "10:30" } }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Timing overlap in new subject for Thu");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_class_is_rejected(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, _) = create_subject(
        &app,
        &token,
        &json!({
            "name": "Biology",
            "classes": ["1999-NOPE-Z-evening"],
            "timings": [{ "days": ["Sat"], "time": { "start": "09:00", "end": "10:00" } }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_twelve_hour_times_are_accepted(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, body) = create_subject(
        &app,
        &token,
        &subject(
            "History",
            json!([{ "days": ["Fri"], "time": { "start": "01:30 PM", "end": "02:30 pm" } }]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["timings"][0]["time"]["start"], "13:30");
    assert_eq!(body["timings"][0]["time"]["end"], "14:30");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_subject_name_leaves_no_rows(pool: PgPool) {
    let (app, token) = setup(pool.clone()).await;

    let (status, _) = create_subject(
        &app,
        &token,
        &subject("Mathematics", slot("Mon", "09:00", "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Different day, so only the name clashes.
    let (status, body) = create_subject(
        &app,
        &token,
        &json!({
            "name": "Mathematics",
            "classes": [CLASS, OTHER_CLASS],
            "timings": slot("Tue", "09:00", "10:00")
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Subject Mathematics already exists");

    assert_eq!(count(&pool, "subjects").await, 1);
    assert_eq!(count(&pool, "subject_classes").await, 1);
    assert_eq!(count(&pool, "subject_timings").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_may_overlap_its_own_old_slot(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, _) = create_subject(
        &app,
        &token,
        &subject("Mathematics", slot("Mon", "09:00", "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = update_subject(
        &app,
        &token,
        "Mathematics",
        &json!({ "timings": slot("Mon", "09:30", "10:30") }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timings"][0]["time"]["start"], "09:30");
    assert_eq!(body["timings"][0]["time"]["end"], "10:30");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_timings_conflicting_with_other_subject(pool: PgPool) {
    let (app, token) = setup(pool).await;

    for (name, start, end) in [("Mathematics", "09:00", "10:00"), ("Physics", "11:00", "12:00")] {
        let (status, _) =
            create_subject(&app, &token, &subject(name, slot("Mon", start, end))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = update_subject(
        &app,
        &token,
        "Physics",
        &json!({ "timings": slot("Mon", "09:30", "10:30") }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Conflict in 2023-SE-IT-A-morning: Timing overlaps on Mon with Mathematics"
    );

    let physics = send(&app, get_request("/api/admin/subjects/Physics", Some(&token))).await;
    assert_eq!(body_json(physics).await["timings"][0]["time"]["start"], "11:00");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_moving_classes_rechecks_stored_timings(pool: PgPool) {
    let (app, token) = setup(pool).await;

    let (status, _) = create_subject(
        &app,
        &token,
        &subject("Mathematics", slot("Mon", "09:00", "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = create_subject(
        &app,
        &token,
        &json!({
            "name": "Physics",
            "classes": [OTHER_CLASS],
            "timings": slot("Mon", "09:30", "10:30")
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = update_subject(
        &app,
        &token,
        "Physics",
        &json!({ "classes": [OTHER_CLASS, CLASS] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Conflict in 2023-SE-IT-A-morning: Timing overlaps on Mon with Mathematics"
    );

    let physics = send(&app, get_request("/api/admin/subjects/Physics", Some(&token))).await;
    assert_eq!(body_json(physics).await["classes"], json!([OTHER_CLASS]));
}
