pub mod auth;
pub mod health;
pub mod inventory;
pub mod members;
pub mod notifications;
pub mod orders;
pub mod qualifications;
pub mod servicebook;
pub mod settings;
pub mod setup;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy (see each module for the full list):
///
/// ```text
/// /setup/*                        bootstrap (reachable before setup)
/// /auth/*                         login, refresh, logout
/// /users/*                        own profile, user and permission admin
///
/// /members/*                      members, statistics, events
/// /parents/*                      parents and guardians
/// /member-events/{id}             edit, delete member events
/// /member-statuses, /member-groups, /event-types   lookups
///
/// /inventory/*                    catalog, locations, stock, ledger
/// /orders/*                       catalog, statuses, orders, workflow
/// /qualifications/*               types, qualifications, dashboard
/// /special-tasks/*                task types, tasks
/// /servicebook/*                  services, attendance, statistics
///
/// /settings/*                     runtime settings per category
/// /notifications/*                preferences, delivery logs, templates
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/setup", setup::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        // Members and their lookup tables.
        .nest("/members", members::router())
        .nest("/parents", members::parents_router())
        .merge(members::lookup_router())
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router())
        .nest("/qualifications", qualifications::router())
        .nest("/special-tasks", qualifications::special_tasks_router())
        .nest("/servicebook", servicebook::router())
        .nest("/settings", settings::router())
        .nest("/notifications", notifications::router())
}
