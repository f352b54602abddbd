//! Inventory over HTTP: ledger bookings drive stock, stock itself is
//! read-only.

mod common;

use axum::http::{Method, StatusCode};
use clubhouse_core::permissions::{ITEM, STOCK, TRANSACTION};
use common::{body_json, get_auth, post_json_auth};
use serde_json::json;
use sqlx::PgPool;

struct Fixture {
    item_id: i64,
    store: i64,
    van: i64,
}

async fn created_id(app: &axum::Router, uri: &str, body: serde_json::Value, token: &str) -> i64 {
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn setup(app: &axum::Router, token: &str) -> Fixture {
    let category_id = created_id(
        app,
        "/api/v1/inventory/categories",
        json!({ "name": "Schläuche" }),
        token,
    )
    .await;
    let item_id = created_id(
        app,
        "/api/v1/inventory/items",
        json!({ "name": "C-Schlauch", "category_id": category_id }),
        token,
    )
    .await;
    let store = created_id(app, "/api/v1/inventory/locations", json!({ "name": "Lager" }), token).await;
    let van = created_id(app, "/api/v1/inventory/locations", json!({ "name": "Fahrzeug" }), token).await;
    Fixture { item_id, store, van }
}

async fn stock_at(app: &axum::Router, token: &str, item_id: i64, location_id: i64) -> i64 {
    let response = get_auth(
        app,
        &format!("/api/v1/inventory/stock?item_id={item_id}&location_id={location_id}"),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]
        .as_array()
        .unwrap()
        .first()
        .map(|row| row["quantity"].as_i64().unwrap())
        .unwrap_or(0)
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_in_out_and_insufficient_stock(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let f = setup(&app, &token).await;

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "IN", "item_id": f.item_id, "target_id": f.store, "quantity": 10 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(stock_at(&app, &token, f.item_id, f.store).await, 10);

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "MOVE", "item_id": f.item_id, "source_id": f.store, "target_id": f.van, "quantity": 6 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(stock_at(&app, &token, f.item_id, f.store).await, 4);
    assert_eq!(stock_at(&app, &token, f.item_id, f.van).await, 6);

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "OUT", "item_id": f.item_id, "source_id": f.store, "quantity": 5 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("Available: 4"));

    // The rejected booking left no trace.
    assert_eq!(stock_at(&app, &token, f.item_id, f.store).await, 4);
    let response = get_auth(&app, "/api/v1/inventory/transactions", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_booking_requires_locations(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let f = setup(&app, &token).await;

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "IN", "item_id": f.item_id, "quantity": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "IN", "item_id": f.item_id, "target_id": f.store, "quantity": 0 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_stock_cannot_be_written(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;
    let f = setup(&app, &token).await;

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/stock",
        json!({ "item_id": f.item_id, "location_id": f.store, "quantity": 99 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["code"], "METHOD_NOT_ALLOWED");

    let response = common::send(&app, Method::DELETE, "/api/v1/inventory/stock/1", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(stock_at(&app, &token, f.item_id, f.store).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_discard_needs_its_own_permission(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;
    let f = setup(&app, &admin).await;
    post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "IN", "item_id": f.item_id, "target_id": f.store, "quantity": 3 }),
        &admin,
    )
    .await;

    common::create_user_with(&pool, "geraetewart", &[TRANSACTION.add, STOCK.view, ITEM.view]).await;
    let token = common::login(&app, "geraetewart").await;

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "DISCARD", "item_id": f.item_id, "source_id": f.store, "quantity": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        "/api/v1/inventory/transactions",
        json!({ "transaction_type": "OUT", "item_id": f.item_id, "source_id": f.store, "quantity": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(stock_at(&app, &token, f.item_id, f.store).await, 2);
}
