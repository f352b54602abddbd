//! Route definitions for qualifications and special tasks.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::qualifications;
use crate::state::AppState;

/// Routes mounted at `/qualifications`.
///
/// ```text
/// GET    /types           -> list_types
/// POST   /types           -> create_type
/// PUT    /types/{id}      -> update_type
/// DELETE /types/{id}      -> delete_type
/// GET    /dashboard       -> dashboard
/// GET    /                -> list_qualifications
/// POST   /                -> create_qualification
/// GET    /{id}            -> get_qualification
/// PUT    /{id}            -> update_qualification
/// DELETE /{id}            -> delete_qualification
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/types",
            get(qualifications::list_types).post(qualifications::create_type),
        )
        .route(
            "/types/{id}",
            put(qualifications::update_type).delete(qualifications::delete_type),
        )
        .route("/dashboard", get(qualifications::dashboard))
        .route(
            "/",
            get(qualifications::list_qualifications).post(qualifications::create_qualification),
        )
        .route(
            "/{id}",
            get(qualifications::get_qualification)
                .put(qualifications::update_qualification)
                .delete(qualifications::delete_qualification),
        )
}

/// Routes mounted at `/special-tasks`.
///
/// ```text
/// GET    /types           -> list_task_types
/// POST   /types           -> create_task_type
/// PUT    /types/{id}      -> update_task_type
/// DELETE /types/{id}      -> delete_task_type
/// GET    /                -> list_tasks
/// POST   /                -> create_task
/// GET    /{id}            -> get_task
/// PUT    /{id}            -> update_task
/// DELETE /{id}            -> delete_task
/// ```
pub fn special_tasks_router() -> Router<AppState> {
    Router::new()
        .route(
            "/types",
            get(qualifications::list_task_types).post(qualifications::create_task_type),
        )
        .route(
            "/types/{id}",
            put(qualifications::update_task_type).delete(qualifications::delete_task_type),
        )
        .route(
            "/",
            get(qualifications::list_tasks).post(qualifications::create_task),
        )
        .route(
            "/{id}",
            get(qualifications::get_task)
                .put(qualifications::update_task)
                .delete(qualifications::delete_task),
        )
}
