//! Route definitions for the `/inventory` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::inventory;
use crate::state::AppState;

/// Routes mounted at `/inventory`.
///
/// Stock rows are read-only: every write method on them answers 405.
///
/// ```text
/// GET    /categories                     -> list_categories
/// POST   /categories                     -> create_category
/// GET    /categories/{id}                -> get_category
/// PUT    /categories/{id}                -> update_category
/// DELETE /categories/{id}                -> delete_category
///
/// GET    /items                          -> list_items
/// POST   /items                          -> create_item
/// GET    /items/{id}                     -> get_item
/// PUT    /items/{id}                     -> update_item
/// DELETE /items/{id}                     -> delete_item
///
/// GET    /variants                       -> list_variants (?parent_item_id=)
/// POST   /variants                       -> create_variant
/// GET    /variants/{id}                  -> get_variant
/// PUT    /variants/{id}                  -> update_variant
/// DELETE /variants/{id}                  -> delete_variant
///
/// GET    /locations                      -> list_locations
/// POST   /locations                      -> create_location
/// POST   /locations/provision-members    -> provision_member_locations
/// GET    /locations/{id}                 -> get_location
/// PUT    /locations/{id}                 -> update_location
/// DELETE /locations/{id}                 -> delete_location
///
/// GET    /stock                          -> list_stock
/// GET    /stock/{id}                     -> get_stock
///
/// GET    /transactions                   -> list_transactions
/// POST   /transactions                   -> create_transaction
/// GET    /transactions/{id}              -> get_transaction
///
/// GET    /dashboard                      -> dashboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(inventory::list_categories).post(inventory::create_category),
        )
        .route(
            "/categories/{id}",
            get(inventory::get_category)
                .put(inventory::update_category)
                .delete(inventory::delete_category),
        )
        .route(
            "/items",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route(
            "/items/{id}",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route(
            "/variants",
            get(inventory::list_variants).post(inventory::create_variant),
        )
        .route(
            "/variants/{id}",
            get(inventory::get_variant)
                .put(inventory::update_variant)
                .delete(inventory::delete_variant),
        )
        .route(
            "/locations",
            get(inventory::list_locations).post(inventory::create_location),
        )
        .route(
            "/locations/provision-members",
            post(inventory::provision_member_locations),
        )
        .route(
            "/locations/{id}",
            get(inventory::get_location)
                .put(inventory::update_location)
                .delete(inventory::delete_location),
        )
        .route(
            "/stock",
            get(inventory::list_stock)
                .post(inventory::stock_is_read_only)
                .put(inventory::stock_is_read_only)
                .patch(inventory::stock_is_read_only)
                .delete(inventory::stock_is_read_only),
        )
        .route(
            "/stock/{id}",
            get(inventory::get_stock)
                .post(inventory::stock_is_read_only)
                .put(inventory::stock_is_read_only)
                .patch(inventory::stock_is_read_only)
                .delete(inventory::stock_is_read_only),
        )
        .route(
            "/transactions",
            get(inventory::list_transactions).post(inventory::create_transaction),
        )
        .route("/transactions/{id}", get(inventory::get_transaction))
        .route("/dashboard", get(inventory::dashboard))
}
