//! Route definitions for members, parents and the member lookup tables.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::members;
use crate::state::AppState;

/// Routes mounted at `/members`.
///
/// ```text
/// GET    /                 -> list_members
/// POST   /                 -> create_member
/// GET    /statistics       -> member_statistics
/// GET    /{id}             -> get_member
/// PUT    /{id}             -> update_member
/// DELETE /{id}             -> delete_member
/// GET    /{id}/parents     -> member_parents
/// GET    /{id}/events      -> list_member_events
/// POST   /{id}/events      -> create_member_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(members::list_members).post(members::create_member))
        .route("/statistics", get(members::member_statistics))
        .route(
            "/{id}",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/{id}/parents", get(members::member_parents))
        .route(
            "/{id}/events",
            get(members::list_member_events).post(members::create_member_event),
        )
}

/// Routes mounted at `/parents`.
///
/// ```text
/// GET    /        -> list_parents (?search=)
/// POST   /        -> create_parent
/// GET    /{id}    -> get_parent
/// PUT    /{id}    -> update_parent
/// DELETE /{id}    -> delete_parent
/// ```
pub fn parents_router() -> Router<AppState> {
    Router::new()
        .route("/", get(members::list_parents).post(members::create_parent))
        .route(
            "/{id}",
            get(members::get_parent)
                .put(members::update_parent)
                .delete(members::delete_parent),
        )
}

/// Member events and lookup tables, merged at the API root.
///
/// ```text
/// PUT    /member-events/{id}      -> update_member_event
/// DELETE /member-events/{id}      -> delete_member_event
/// GET    /member-statuses         -> list_statuses
/// POST   /member-statuses         -> create_status
/// PUT    /member-statuses/{id}    -> update_status
/// DELETE /member-statuses/{id}    -> delete_status
/// GET    /member-groups           -> list_groups
/// POST   /member-groups           -> create_group
/// PUT    /member-groups/{id}      -> rename_group
/// DELETE /member-groups/{id}      -> delete_group
/// GET    /event-types             -> list_event_types
/// POST   /event-types             -> create_event_type
/// PUT    /event-types/{id}        -> rename_event_type
/// DELETE /event-types/{id}        -> delete_event_type
/// ```
pub fn lookup_router() -> Router<AppState> {
    Router::new()
        .route(
            "/member-events/{id}",
            put(members::update_member_event).delete(members::delete_member_event),
        )
        .route(
            "/member-statuses",
            get(members::list_statuses).post(members::create_status),
        )
        .route(
            "/member-statuses/{id}",
            put(members::update_status).delete(members::delete_status),
        )
        .route(
            "/member-groups",
            get(members::list_groups).post(members::create_group),
        )
        .route(
            "/member-groups/{id}",
            put(members::rename_group).delete(members::delete_group),
        )
        .route(
            "/event-types",
            get(members::list_event_types).post(members::create_event_type),
        )
        .route(
            "/event-types/{id}",
            put(members::rename_event_type).delete(members::delete_event_type),
        )
}
