//! Equipment orders over HTTP: creation, the status workflow and its
//! notifications.

mod common;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::Router;
use common::{body_json, get_auth, post_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn create(app: &Router, uri: &str, body: Value, token: &str) -> Value {
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await["data"].clone()
}

/// A member with an email, one sized catalog entry and an order of two
/// items. Returns the order JSON.
async fn place_order(app: &Router, token: &str) -> Value {
    let member = create(
        app,
        "/api/v1/members",
        json!({ "name": "Lena", "lastname": "Brandt", "email": "lena@example.org" }),
        token,
    )
    .await;
    let helmet = create(
        app,
        "/api/v1/orders/catalog",
        json!({
            "name": "Helm",
            "category": "Schutzausrüstung",
            "has_sizes": true,
            "available_sizes": "S, M, L"
        }),
        token,
    )
    .await;
    let gloves = create(
        app,
        "/api/v1/orders/catalog",
        json!({ "name": "Handschuhe" }),
        token,
    )
    .await;
    create(
        app,
        "/api/v1/orders",
        json!({
            "member_id": member["id"],
            "items": [
                { "item_id": helmet["id"], "size": "M" },
                { "item_id": gloves["id"], "quantity": 2 }
            ]
        }),
        token,
    )
    .await
}

async fn change_status(app: &Router, token: &str, item_id: &Value, status: &str) -> Response<Body> {
    post_json_auth(
        app,
        &format!("/api/v1/orders/items/{item_id}/status"),
        json!({ "status": status }),
        token,
    )
    .await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_new_items_start_pending(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &token).await;

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["status_code"] == "pending"));
    assert_eq!(items[0]["size"], "M");
    assert_eq!(items[1]["quantity"], 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_size_must_be_offered(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &token).await;
    let helmet_id = order["items"][0]["item_id"].clone();

    let response = post_json_auth(
        &app,
        "/api/v1/orders",
        json!({ "member_id": order["member_id"], "items": [{ "item_id": helmet_id, "size": "XXL" }] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/v1/orders",
        json!({ "member_id": order["member_id"], "items": [] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_status_workflow_records_history(pool: PgPool) {
    let (app, mailer) = common::build_test_app_with_mailer(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &token).await;
    let item_id = order["items"][0]["id"].clone();

    let response = change_status(&app, &token, &item_id, "ordered").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["from_status"], "pending");
    assert_eq!(json["data"]["item"]["status_code"], "ordered");
    // The member and the ordering user.
    assert_eq!(json["data"]["notification"]["recipients"], 2);
    assert_eq!(json["data"]["notification"]["sent"], 2);
    assert!(mailer.sent().iter().any(|m| m.to == "lena@example.org"));

    let response = change_status(&app, &token, &item_id, "received").await;
    let json = body_json(response).await;
    assert!(json["data"]["item"]["received_date"].is_string());

    let response = get_auth(&app, &format!("/api/v1/orders/items/{item_id}/history"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await["data"].as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_invalid_transition_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &token).await;
    let item_id = order["items"][0]["id"].clone();

    let response = change_status(&app, &token, &item_id, "delivered").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Cannot transition"));

    let response = change_status(&app, &token, &item_id, "pending").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = change_status(&app, &token, &item_id, "no-such-status").await;
    assert_ne!(response.status(), StatusCode::OK);

    // Nothing was written.
    let response = get_auth(&app, &format!("/api/v1/orders/items/{item_id}/history"), &token).await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_bulk_status_reports_blocked_items(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &token).await;
    let first = order["items"][0]["id"].clone();
    let second = order["items"][1]["id"].clone();

    change_status(&app, &token, &first, "ordered").await;

    let response = post_json_auth(
        &app,
        "/api/v1/orders/items/bulk-status",
        json!({ "item_ids": [first, second, 999999], "status": "received" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["allowed"], json!([first]));
    assert_eq!(data["blocked"].as_array().unwrap().len(), 1);
    assert_eq!(data["errors"].as_array().unwrap().len(), 1);
    assert_eq!(data["updated"].as_array().unwrap().len(), 1);
    assert_eq!(data["updated"][0]["status_code"], "received");
    assert!(data["notification"].is_object());
    assert!(data.get("result").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_status_change_requires_permission(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;
    let order = place_order(&app, &admin).await;
    let item_id = order["items"][0]["id"].clone();

    common::create_user_with(&pool, "leser", &[clubhouse_core::permissions::ORDER.view]).await;
    let token = common::login(&app, "leser").await;

    let response = get_auth(&app, "/api/v1/orders", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = change_status(&app, &token, &item_id, "ordered").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
