//! Route definitions for the `/settings` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// Section routes check per-category view/change permissions.
///
/// ```text
/// GET    /app                  -> app_settings (any authenticated user)
/// GET    /categories           -> list_categories
/// GET    /{section}            -> get_section
/// PUT    /{section}            -> update_section
/// POST   /{section}/reset      -> reset_section
/// DELETE /{section}/{name}     -> reset_value
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app", get(settings::app_settings))
        .route("/categories", get(settings::list_categories))
        .route(
            "/{section}",
            get(settings::get_section).put(settings::update_section),
        )
        .route("/{section}/reset", post(settings::reset_section))
        .route("/{section}/{name}", delete(settings::reset_value))
}
