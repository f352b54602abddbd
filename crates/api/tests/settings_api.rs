//! Runtime settings over HTTP: per-category access, secrets and validation.

mod common;

use axum::http::StatusCode;
use clubhouse_core::permissions::{settings_permission, SettingsAccess};
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth};
use serde_json::{json, Value};
use sqlx::PgPool;

fn entry<'a>(values: &'a Value, name: &str) -> &'a Value {
    values
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == name)
        .unwrap_or_else(|| panic!("setting {name} missing"))
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_section_defaults_and_update(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let response = get_auth(&app, "/api/v1/settings/members", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let threshold = entry(&json["data"], "alert_threshold");
    assert_eq!(threshold["value"], 3);
    assert_eq!(threshold["is_default"], true);

    let response = put_json_auth(
        &app,
        "/api/v1/settings/members",
        json!({ "alert_threshold": "5" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let threshold = entry(&json["data"], "alert_threshold");
    assert_eq!(threshold["value"], 5);
    assert_eq!(threshold["is_default"], false);
    // Untouched values keep their defaults.
    assert_eq!(entry(&json["data"], "alert_threshold_last_entries")["value"], 10);

    let response = delete_auth(&app, "/api/v1/settings/members/alert_threshold", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let json = body_json(get_auth(&app, "/api/v1/settings/members", &token).await).await;
    assert_eq!(entry(&json["data"], "alert_threshold")["value"], 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_invalid_values_write_nothing(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let response = put_json_auth(
        &app,
        "/api/v1/settings/members",
        json!({ "alert_threshold": 4, "alert_threshold_last_entries": 0 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(get_auth(&app, "/api/v1/settings/members", &token).await).await;
    assert_eq!(entry(&json["data"], "alert_threshold")["value"], 3);

    let response = put_json_auth(
        &app,
        "/api/v1/settings/service",
        json!({ "service_start_time": "25:99" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        &app,
        "/api/v1/settings/orders",
        json!({ "equipment_manager_email": "not-an-address" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(&app, "/api/v1/settings/nonsense", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_secret_is_write_only(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = common::admin_token(&pool, &app).await;

    let json = body_json(get_auth(&app, "/api/v1/settings/email", &token).await).await;
    let password = entry(&json["data"], "email_host_password");
    assert!(password["value"].is_null());
    assert_eq!(password["is_set"], false);

    let response = put_json_auth(
        &app,
        "/api/v1/settings/email",
        json!({ "email_host_password": "geheim-123" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let password = entry(&json["data"], "email_host_password");
    assert!(password["value"].is_null());
    assert_eq!(password["is_set"], true);
    assert!(!json.to_string().contains("geheim-123"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_access_is_granted_per_category(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;
    let view_members = settings_permission("members", SettingsAccess::View);
    common::create_user_with(&pool, "jugendwart", &[view_members.as_str()]).await;
    let token = common::login(&app, "jugendwart").await;

    let response = get_auth(&app, "/api/v1/settings/members", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(&app, "/api/v1/settings/email", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = put_json_auth(
        &app,
        "/api/v1/settings/members",
        json!({ "alert_threshold": 4 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(&app, "/api/v1/settings/members/reset", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(get_auth(&app, "/api/v1/settings/categories", &token).await).await;
    let codes: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["members"]);

    let json = body_json(get_auth(&app, "/api/v1/settings/categories", &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_app_settings_for_everyone(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;
    put_json_auth(
        &app,
        "/api/v1/settings/orders",
        json!({ "equipment_manager_email": "geraete@example.org" }),
        &admin,
    )
    .await;

    common::create_user(&pool, "mitglied", false).await;
    let token = common::login(&app, "mitglied").await;
    let response = get_auth(&app, "/api/v1/settings/app", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["app_name"], "JF Manager");
    assert_eq!(json["data"]["equipment_manager_email"], "geraete@example.org");

    let response = post_json_auth(&app, "/api/v1/settings/orders/reset", json!({}), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(get_auth(&app, "/api/v1/settings/app", &token).await).await;
    assert_eq!(json["data"]["equipment_manager_email"], "");
}
