mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{memory_app, send, teacher};
use serde_json::{json, Value};

async fn school() -> Router {
    let app = memory_app();
    let created = send(
        &app,
        Method::POST,
        "/teachers",
        Some(json!([
            teacher("John", "john@s.test", "9A"),
            teacher("Ann", "ann@s.test", "9B"),
            teacher("Bob", "bob@s.test", "9C")
        ])),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    app
}

async fn teachers(app: &Router) -> Value {
    send(app, Method::GET, "/teachers", None).await.json()["data"].clone()
}

#[tokio::test]
async fn valid_batch_applies_every_entry() {
    let app = school().await;

    let reply = send(
        &app,
        Method::PATCH,
        "/teachers",
        Some(json!([
            {"id": "1", "first_name": "Jane"},
            {"id": "3", "class": "10A", "subject": "Physics"}
        ])),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT, "{}", reply.text);
    assert!(reply.text.is_empty());

    let after = teachers(&app).await;
    assert_eq!(after[0]["first_name"], "Jane");
    assert_eq!(after[0]["last_name"], "Doe");
    assert_eq!(after[1]["first_name"], "Ann");
    assert_eq!(after[2]["class"], "10A");
    assert_eq!(after[2]["subject"], "Physics");
}

#[tokio::test]
async fn missing_record_rolls_back_the_batch() {
    let app = school().await;
    let before = teachers(&app).await;

    let reply = send(
        &app,
        Method::PATCH,
        "/teachers",
        Some(json!([
            {"id": "1", "first_name": "Jane"},
            {"id": "99", "first_name": "Ghost"}
        ])),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.text, "Teacher not found: 99");
    assert_eq!(teachers(&app).await, before);
}

#[tokio::test]
async fn unknown_field_is_rejected_before_any_write() {
    let app = school().await;
    let before = teachers(&app).await;

    let reply = send(
        &app,
        Method::PATCH,
        "/teachers",
        Some(json!([{"id": "1", "first_name": "Jane"}, {"id": "2", "favourite": "tea"}])),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(teachers(&app).await, before);
}

#[tokio::test]
async fn malformed_or_missing_identifiers() {
    let app = school().await;

    let numeric = send(&app, Method::PATCH, "/teachers", Some(json!([{"id": 1, "first_name": "Jane"}]))).await;
    assert_eq!(numeric.status, StatusCode::BAD_REQUEST);

    let missing = send(&app, Method::PATCH, "/teachers", Some(json!([{"first_name": "Jane"}]))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let garbage = send(&app, Method::PATCH, "/teachers", Some(json!([{"id": "one", "first_name": "Jane"}]))).await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);

    assert_eq!(teachers(&app).await[0]["first_name"], "John");
}

#[tokio::test]
async fn type_mismatch_names_the_field() {
    let app = school().await;

    let reply = send(&app, Method::PATCH, "/teachers", Some(json!([{"id": "2", "class": 10}]))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.text.contains("'class'"), "{}", reply.text);
}

#[tokio::test]
async fn duplicate_email_in_batch_is_a_conflict() {
    let app = school().await;

    let reply = send(
        &app,
        Method::PATCH,
        "/teachers",
        Some(json!([{"id": "1", "first_name": "Jane"}, {"id": "2", "email": "bob@s.test"}])),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(teachers(&app).await[0]["first_name"], "John");
}

#[tokio::test]
async fn empty_batch_and_invalid_json() {
    let app = school().await;

    let empty = send(&app, Method::PATCH, "/teachers", Some(json!([]))).await;
    assert_eq!(empty.status, StatusCode::NO_CONTENT);

    let object = send(&app, Method::PATCH, "/teachers", Some(json!({"id": "1"}))).await;
    assert_eq!(object.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let app = school().await;

    let partial = send(&app, Method::DELETE, "/teachers", Some(json!([1, 42]))).await;
    assert_eq!(partial.status, StatusCode::BAD_REQUEST);
    assert_eq!(teachers(&app).await.as_array().unwrap().len(), 3);

    let strings = send(&app, Method::DELETE, "/teachers", Some(json!(["1"]))).await;
    assert_eq!(strings.status, StatusCode::BAD_REQUEST);

    let reply = send(&app, Method::DELETE, "/teachers", Some(json!([1, 3]))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"status": "Teachers successfully deleted", "deleted_ids": [1, 3]}));

    let left = teachers(&app).await;
    assert_eq!(left.as_array().unwrap().len(), 1);
    assert_eq!(left[0]["first_name"], "Ann");
}

#[tokio::test]
async fn exec_batches_coerce_booleans_and_nulls() {
    let app = memory_app();
    let created = send(
        &app,
        Method::POST,
        "/execs",
        Some(json!([{
            "first_name": "Eve",
            "last_name": "Moneypenny",
            "email": "eve@s.test",
            "username": "eve",
            "role": "principal",
            "inactive_status": false,
            "user_created_at": "2024-01-01"
        }])),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);

    let reply = send(
        &app,
        Method::PATCH,
        "/execs",
        Some(json!([{"id": "1", "inactive_status": true, "user_created_at": null}])),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT, "{}", reply.text);

    let exec = send(&app, Method::GET, "/execs/1", None).await.json();
    assert_eq!(exec["inactive_status"], true);
    assert!(exec.get("user_created_at").map_or(true, Value::is_null));

    let inactive = send(&app, Method::GET, "/execs?inactive_status=true", None).await;
    assert_eq!(inactive.json()["count"], 1);
    let bad_flag = send(&app, Method::GET, "/execs?inactive_status=maybe", None).await;
    assert_eq!(bad_flag.status, StatusCode::BAD_REQUEST);
}
