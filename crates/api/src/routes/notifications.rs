//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /preferences            -> get_preferences
/// PUT    /preferences            -> update_preferences
///
/// GET    /logs                   -> list_logs
/// GET    /logs/stats             -> log_stats
/// GET    /logs/{id}              -> get_log
/// POST   /logs/{id}/retry        -> retry_log
///
/// GET    /templates              -> list_templates
/// POST   /templates              -> create_template
/// GET    /templates/{id}         -> get_template
/// PUT    /templates/{id}         -> update_template
/// DELETE /templates/{id}         -> delete_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/preferences",
            get(notifications::get_preferences).put(notifications::update_preferences),
        )
        .route("/logs", get(notifications::list_logs))
        .route("/logs/stats", get(notifications::log_stats))
        .route("/logs/{id}", get(notifications::get_log))
        .route("/logs/{id}/retry", post(notifications::retry_log))
        .route(
            "/templates",
            get(notifications::list_templates).post(notifications::create_template),
        )
        .route(
            "/templates/{id}",
            get(notifications::get_template)
                .put(notifications::update_template)
                .delete(notifications::delete_template),
        )
}
