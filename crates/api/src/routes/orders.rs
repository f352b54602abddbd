//! Route definitions for the `/orders` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// Routes mounted at `/orders`.
///
/// ```text
/// GET    /catalog                  -> list_orderable_items (?active_only=)
/// POST   /catalog                  -> create_orderable_item
/// GET    /catalog/{id}             -> get_orderable_item
/// PUT    /catalog/{id}             -> update_orderable_item
/// DELETE /catalog/{id}             -> delete_orderable_item
///
/// GET    /statuses                 -> list_statuses
/// POST   /statuses                 -> create_status
/// PUT    /statuses/{id}            -> update_status
/// DELETE /statuses/{id}            -> delete_status
///
/// GET    /                         -> list_orders
/// POST   /                         -> create_order
/// GET    /{id}                     -> get_order
/// PUT    /{id}                     -> update_order
/// DELETE /{id}                     -> delete_order
///
/// GET    /items                    -> list_order_items
/// POST   /items/bulk-status        -> bulk_update_status
/// GET    /items/{id}               -> get_order_item
/// PUT    /items/{id}               -> update_order_item
/// DELETE /items/{id}               -> delete_order_item
/// POST   /items/{id}/status        -> change_item_status
/// GET    /items/{id}/history       -> item_history
///
/// GET    /statistics               -> statistics
/// GET    /workflow                 -> workflow
/// POST   /reminders                -> send_reminders
/// POST   /summary                  -> send_summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/catalog",
            get(orders::list_orderable_items).post(orders::create_orderable_item),
        )
        .route(
            "/catalog/{id}",
            get(orders::get_orderable_item)
                .put(orders::update_orderable_item)
                .delete(orders::delete_orderable_item),
        )
        .route(
            "/statuses",
            get(orders::list_statuses).post(orders::create_status),
        )
        .route(
            "/statuses/{id}",
            axum::routing::put(orders::update_status).delete(orders::delete_status),
        )
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/items", get(orders::list_order_items))
        .route("/items/bulk-status", post(orders::bulk_update_status))
        .route(
            "/items/{id}",
            get(orders::get_order_item)
                .put(orders::update_order_item)
                .delete(orders::delete_order_item),
        )
        .route("/items/{id}/status", post(orders::change_item_status))
        .route("/items/{id}/history", get(orders::item_history))
        .route("/statistics", get(orders::statistics))
        .route("/workflow", get(orders::workflow))
        .route("/reminders", post(orders::send_reminders))
        .route("/summary", post(orders::send_summary))
}
