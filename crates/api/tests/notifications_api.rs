//! Notification logs and retries over HTTP, driven by order events.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get_auth, post_json_auth, put_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create(app: &Router, uri: &str, body: Value, token: &str) -> Value {
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await["data"].clone()
}

async fn place_order(app: &Router, token: &str) -> Value {
    let member = create(
        app,
        "/api/v1/members",
        json!({ "name": "Mia", "lastname": "Hoffmann", "email": "mia@example.org" }),
        token,
    )
    .await;
    let item = create(app, "/api/v1/orders/catalog", json!({ "name": "T-Shirt" }), token).await;
    create(
        app,
        "/api/v1/orders",
        json!({ "member_id": member["id"], "items": [{ "item_id": item["id"] }] }),
        token,
    )
    .await
}

async fn logs(app: &Router, token: &str, query: &str) -> Vec<Value> {
    let response = get_auth(app, &format!("/api/v1/notifications/logs{query}"), token).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].as_array().unwrap().clone()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_order_created_notifies_staff(pool: PgPool) {
    let (app, mailer) = common::build_test_app_with_mailer(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    place_order(&app, &token).await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "admin@example.org");

    let entries = logs(&app, &token, "?notification_type=order_created").await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "sent");
    assert!(entries[0]["sent_at"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_failed_delivery_does_not_fail_the_request(pool: PgPool) {
    let (app, mailer) = common::build_test_app_with_mailer(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    mailer.set_failure(Some("connection refused"));

    // The order is still created.
    place_order(&app, &token).await;

    let entries = logs(&app, &token, "?status=failed").await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["error_message"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
    assert_eq!(entries[0]["retry_count"], 0);

    let response = get_auth(&app, "/api/v1/notifications/logs/stats", &token).await;
    assert_eq!(body_json(response).await["data"]["failed"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_retry_resends_stored_content(pool: PgPool) {
    let (app, mailer) = common::build_test_app_with_mailer(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    mailer.set_failure(Some("timeout"));
    place_order(&app, &token).await;
    let failed = logs(&app, &token, "?status=failed").await.remove(0);
    let retry = format!("/api/v1/notifications/logs/{}/retry", failed["id"]);

    // Still failing: the attempt is counted and the log stays failed.
    let response = post_json_auth(&app, &retry, json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["retry_count"], 1);

    mailer.set_failure(None);
    let response = post_json_auth(&app, &retry, json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "sent");
    assert_eq!(json["data"]["retry_count"], 2);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, failed["subject"].as_str().unwrap());

    let response = post_json_auth(&app, &retry, json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response =
        post_json_auth(&app, "/api/v1/notifications/logs/999999/retry", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_opted_out_users_are_skipped(pool: PgPool) {
    let (app, mailer) = common::build_test_app_with_mailer(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let response = put_json_auth(
        &app,
        "/api/v1/notifications/preferences",
        json!({ "email_new_orders": false }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email_new_orders"], false);

    place_order(&app, &token).await;
    assert!(mailer.sent().is_empty());
    assert!(logs(&app, &token, "").await.is_empty());
}
