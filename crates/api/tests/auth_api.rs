//! Login, lockout, token refresh, logout and user administration.

mod common;

use axum::http::StatusCode;
use clubhouse_core::permissions::MEMBER;
use common::{body_json, get_auth, post_json, post_json_auth, put_json_auth, PASSWORD};
use serde_json::json;
use sqlx::PgPool;

async fn login_json(app: &axum::Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let body = json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    let status = response.status();
    (status, body_json(response).await)
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let user = common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let (status, json) = login_json(&app, "chef", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["username"], "chef");
    assert!(json["user"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let (status, json) = login_json(&app, "chef", "incorrect_password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, _) = login_json(&app, "ghost", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_account_locks_after_repeated_failures(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    common::create_user(&pool, "gruppe", false).await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let (status, _) = login_json(&app, "gruppe", "incorrect_password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, json) = login_json(&app, "gruppe", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].as_str().unwrap().contains("locked"));
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_refresh_rotates_token(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let (_, json) = login_json(&app, "chef", PASSWORD).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], json["refresh_token"]);

    let replay = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // The replay also burnt the session issued by the rotation.
    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": rotated["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_logout_revokes_sessions(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let (_, json) = login_json(&app, "chef", PASSWORD).await;
    let access = json["access_token"].as_str().unwrap();
    let refresh_token = json["refresh_token"].as_str().unwrap();

    let response = post_json_auth(&app, "/api/v1/auth/logout", json!({}), access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_change_own_password(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let (_, json) = login_json(&app, "chef", PASSWORD).await;
    let access = json["access_token"].as_str().unwrap();
    let refresh_token = json["refresh_token"].as_str().unwrap();

    let response = post_json_auth(
        &app,
        "/api/v1/auth/password",
        json!({ "current_password": "wrong-password", "new_password": "Neues-Passwort-1" }),
        access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/v1/auth/password",
        json!({ "current_password": PASSWORD, "new_password": "kurz" }),
        access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        "/api/v1/auth/password",
        json!({ "current_password": PASSWORD, "new_password": "Neues-Passwort-1" }),
        access,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = login_json(&app, "chef", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login_json(&app, "chef", "Neues-Passwort-1").await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_missing_token_is_unauthorized(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let app = common::build_test_app(pool);

    let response = common::get(&app, "/api/v1/users/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(&app, "/api/v1/users/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Users and permissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_me_lists_granted_permissions(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    common::create_user_with(&pool, "jugendwart", &[MEMBER.view]).await;
    let app = common::build_test_app(pool);
    let token = common::login(&app, "jugendwart").await;

    let response = get_auth(&app, "/api/v1/users/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "jugendwart");
    assert_eq!(json["data"]["permissions"], json!([MEMBER.view]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_user_admin_requires_superuser(pool: PgPool) {
    common::create_user(&pool, "chef", true).await;
    let regular = common::create_user(&pool, "gruppe", false).await;
    let app = common::build_test_app(pool);

    let token = common::login(&app, "gruppe").await;
    let response = get_auth(&app, "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = common::login(&app, "chef").await;
    let response = put_json_auth(
        &app,
        &format!("/api/v1/users/{}/permissions", regular.id),
        json!({ "permissions": [MEMBER.view, MEMBER.change] }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["permissions"].as_array().unwrap().len(), 2);

    let response = get_auth(&app, "/api/v1/members", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_unknown_permission_is_rejected(pool: PgPool) {
    let regular = common::create_user(&pool, "gruppe", false).await;
    let app = common::build_test_app(pool.clone());
    let admin = common::admin_token(&pool, &app).await;

    let response = put_json_auth(
        &app,
        &format!("/api/v1/users/{}/permissions", regular.id),
        json!({ "permissions": ["not a codename"] }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
