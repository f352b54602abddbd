#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use clubhouse_api::auth::jwt::JwtConfig;
use clubhouse_api::auth::password::hash_password;
use clubhouse_api::config::ServerConfig;
use clubhouse_api::router::build_app_router;
use clubhouse_api::state::AppState;
use clubhouse_db::models::user::{CreateUser, User};
use clubhouse_db::repositories::{PermissionRepo, UserRepo};
use clubhouse_events::MemoryMailer;

pub const PASSWORD: &str = "test_password_123!";

/// Build a test `ServerConfig` with safe defaults and no SMTP fallback.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret-of-sufficient-length".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        email: None,
    }
}

/// Build the full application router (same middleware stack as `main.rs`)
/// backed by an in-memory mailer.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_mailer(pool).0
}

/// Like [`build_test_app`], also handing out the mailer so tests can inspect
/// sent mail or make delivery fail.
pub fn build_test_app_with_mailer(pool: PgPool) -> (Router, Arc<MemoryMailer>) {
    let config = test_config();
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(pool, config.clone(), mailer.clone());
    (build_app_router(state, &config), mailer)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Create a user directly in the database with [`PASSWORD`].
pub async fn create_user(pool: &PgPool, username: &str, is_superuser: bool) -> User {
    let hashed = hash_password(PASSWORD).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.org"),
            password_hash: hashed,
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            is_staff: is_superuser,
            is_superuser,
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Create a regular user holding `perms`.
pub async fn create_user_with(pool: &PgPool, username: &str, perms: &[&str]) -> User {
    let user = create_user(pool, username, false).await;
    for perm in perms {
        PermissionRepo::grant(pool, user.id, perm)
            .await
            .expect("grant should succeed");
    }
    user
}

/// Log in via the API and return the access token.
pub async fn login(app: &Router, username: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), 200, "login of {username} should succeed");
    let json = body_json(response).await;
    json["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}

/// Create a superuser (which also opens the setup gate) and log in.
pub async fn admin_token(pool: &PgPool, app: &Router) -> String {
    create_user(pool, "admin", true).await;
    login(app, "admin").await
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
