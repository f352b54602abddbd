//! First-run bootstrap: the setup gate and initial superuser creation.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json};
use serde_json::json;
use sqlx::PgPool;

fn superuser_body(username: &str, password: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{username}@example.org"),
        "password": password,
        "first_name": "Erika",
        "last_name": "Muster",
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_api_is_gated_until_superuser_exists(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(&app, "/api/v1/members").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SETUP_REQUIRED");

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "nobody", "password": "whatever" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_health_and_setup_status_bypass_gate(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["setup_complete"], false);

    let response = get(&app, "/api/v1/setup/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["superuser_exists"], false);
    assert_eq!(json["data"]["pending_migrations"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_superuser_opens_gate(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/setup/superuser",
        superuser_body("chef", "a-long-password-1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "chef");
    assert_eq!(json["data"]["is_superuser"], true);

    let body = json!({ "username": "chef", "password": "a-long-password-1" });
    let response = post_json(&app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = get_auth(&app, "/api/v1/members", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&app, "/health").await;
    assert_eq!(body_json(response).await["setup_complete"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_second_superuser_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let first = post_json(
        &app,
        "/api/v1/setup/superuser",
        superuser_body("chef", "a-long-password-1"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(
        &app,
        "/api/v1/setup/superuser",
        superuser_body("usurper", "another-password-2"),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_weak_password_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(&app, "/api/v1/setup/superuser", superuser_body("chef", "short")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/api/v1/setup/status").await;
    assert_eq!(body_json(response).await["data"]["superuser_exists"], false);
}
