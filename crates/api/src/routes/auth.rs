//! Route definitions for the `/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// Login and refresh are public; the rest need a bearer token.
///
/// ```text
/// POST /login     -> login
/// POST /refresh   -> refresh (single-use refresh token)
/// POST /logout    -> logout
/// POST /password  -> change_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/password", post(auth::change_password))
}
