use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether the setup gate has been opened.
    pub setup_complete: bool,
}

/// GET /health -- service, database and setup state.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = clubhouse_db::health_check(&state.pool).await.is_ok();
    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        setup_complete: state.is_setup_complete(),
    })
}

/// Mount health check routes (root level, outside `/api/v1` and the setup gate).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
