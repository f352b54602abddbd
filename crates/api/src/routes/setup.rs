//! Route definitions for the `/setup` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::setup;
use crate::state::AppState;

/// Routes mounted at `/setup`. Reachable before setup is complete.
///
/// ```text
/// GET  /status     -> status
/// POST /superuser  -> create_superuser (only while none exists)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(setup::status))
        .route("/superuser", post(setup::create_superuser))
}
