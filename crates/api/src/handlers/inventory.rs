//! Handlers for the inventory: catalog, storage locations, stock and the
//! transaction ledger.
//!
//! Stock is derived state. It is only ever changed by booking a transaction,
//! so the stock resource answers every mutating method with 405.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::inventory::{
    combined_attributes, validate_attributes, validate_member_location, validate_parent,
    variant_display_name, TransactionType,
};
use clubhouse_core::permissions::{
    CATEGORY, DISCARD_ITEMS, ITEM, ITEM_VARIANT, STOCK, STORAGE_LOCATION, TRANSACTION,
};
use clubhouse_core::types::DbId;
use clubhouse_db::models::inventory::{
    CreateCategory, CreateItem, CreateItemVariant, CreateStorageLocation, CreateTransaction,
    InventoryDashboard, ItemListParams, ItemVariant, ItemVariantResponse, StockListParams,
    TransactionListParams, UpdateCategory, UpdateItem, UpdateItemVariant, UpdateStorageLocation,
};
use clubhouse_db::repositories::{
    CategoryRepo, ItemRepo, ItemVariantRepo, StockRepo, StorageLocationRepo, TransactionRepo,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::permissions::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// Recent ledger entries shown on the dashboard.
const DASHBOARD_RECENT_TRANSACTIONS: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct VariantListParams {
    pub parent_item_id: Option<DbId>,
}

fn variant_response(variant: ItemVariant) -> ItemVariantResponse {
    ItemVariantResponse {
        display_name: variant_display_name(
            &variant.parent_name,
            variant.id,
            &variant.variant_attributes,
        ),
        combined_attributes: combined_attributes(
            &variant.parent_attributes,
            &variant.variant_attributes,
        ),
        variant,
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/categories
pub async fn list_categories(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(CATEGORY.view)?;
    Ok(Json(DataResponse {
        data: CategoryRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/inventory/categories
pub async fn create_category(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<impl IntoResponse> {
    principal.require(CATEGORY.add)?;
    input.validate()?;
    let category = CategoryRepo::create(&state.pool, &input).await?;
    tracing::info!(category_id = category.id, "Inventory category created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// GET /api/v1/inventory/categories/{id}
pub async fn get_category(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(CATEGORY.view)?;
    let category = CategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Category", id))?;
    Ok(Json(DataResponse { data: category }))
}

/// PUT /api/v1/inventory/categories/{id}
pub async fn update_category(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<impl IntoResponse> {
    principal.require(CATEGORY.change)?;
    input.validate()?;
    let category = CategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Category", id))?;
    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/v1/inventory/categories/{id}
pub async fn delete_category(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(CATEGORY.delete)?;
    if !CategoryRepo::delete(&state.pool, id).await? {
        return Err(not_found("Category", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/items
pub async fn list_items(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<ItemListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM.view)?;
    Ok(Json(DataResponse {
        data: ItemRepo::list(&state.pool, &params).await?,
    }))
}

/// POST /api/v1/inventory/items
pub async fn create_item(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateItem>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM.add)?;
    input.validate()?;
    if let Some(attributes) = &input.attributes {
        validate_attributes(attributes)?;
    }
    let item = ItemRepo::create(&state.pool, &input).await?;
    tracing::info!(item_id = item.id, user_id = principal.user_id, "Item created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// GET /api/v1/inventory/items/{id}
pub async fn get_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM.view)?;
    let item = ItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Item", id))?;
    Ok(Json(DataResponse { data: item }))
}

/// PUT /api/v1/inventory/items/{id}
pub async fn update_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateItem>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM.change)?;
    input.validate()?;
    if let Some(attributes) = &input.attributes {
        validate_attributes(attributes)?;
    }
    let item = ItemRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Item", id))?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/inventory/items/{id}
pub async fn delete_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ITEM.delete)?;
    if !ItemRepo::delete(&state.pool, id).await? {
        return Err(not_found("Item", id));
    }
    tracing::info!(item_id = id, user_id = principal.user_id, "Item deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/variants
pub async fn list_variants(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<VariantListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM_VARIANT.view)?;
    let variants: Vec<ItemVariantResponse> =
        ItemVariantRepo::list(&state.pool, params.parent_item_id)
            .await?
            .into_iter()
            .map(variant_response)
            .collect();
    Ok(Json(DataResponse { data: variants }))
}

/// POST /api/v1/inventory/variants
///
/// The parent item must be flagged as a variant parent.
pub async fn create_variant(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateItemVariant>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM_VARIANT.add)?;
    validate_attributes(&input.variant_attributes)?;
    let parent = ItemRepo::find_by_id(&state.pool, input.parent_item_id)
        .await?
        .ok_or_else(|| not_found("Item", input.parent_item_id))?;
    if !parent.is_variant_parent {
        return Err(AppError::BadRequest(format!(
            "Item '{}' is not a variant parent",
            parent.name
        )));
    }

    let variant = ItemVariantRepo::create(&state.pool, &input).await?;
    tracing::info!(variant_id = variant.id, parent_item_id = parent.id, "Variant created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: variant_response(variant),
        }),
    ))
}

/// GET /api/v1/inventory/variants/{id}
pub async fn get_variant(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM_VARIANT.view)?;
    let variant = ItemVariantRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("ItemVariant", id))?;
    Ok(Json(DataResponse {
        data: variant_response(variant),
    }))
}

/// PUT /api/v1/inventory/variants/{id}
pub async fn update_variant(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateItemVariant>,
) -> AppResult<impl IntoResponse> {
    principal.require(ITEM_VARIANT.change)?;
    if let Some(attributes) = &input.variant_attributes {
        validate_attributes(attributes)?;
    }
    let variant = ItemVariantRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("ItemVariant", id))?;
    Ok(Json(DataResponse {
        data: variant_response(variant),
    }))
}

/// DELETE /api/v1/inventory/variants/{id}
pub async fn delete_variant(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ITEM_VARIANT.delete)?;
    if !ItemVariantRepo::delete(&state.pool, id).await? {
        return Err(not_found("ItemVariant", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Storage locations
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/locations
///
/// Every location with its full path and depth.
pub async fn list_locations(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(STORAGE_LOCATION.view)?;
    Ok(Json(DataResponse {
        data: StorageLocationRepo::list_with_paths(&state.pool).await?,
    }))
}

/// POST /api/v1/inventory/locations
pub async fn create_location(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateStorageLocation>,
) -> AppResult<impl IntoResponse> {
    principal.require(STORAGE_LOCATION.add)?;
    input.validate()?;
    validate_member_location(input.is_member, input.member_id)?;

    let location = StorageLocationRepo::create(&state.pool, &input).await?;
    let response = StorageLocationRepo::find_with_path(&state.pool, location.id)
        .await?
        .ok_or_else(|| not_found("StorageLocation", location.id))?;
    tracing::info!(location_id = location.id, "Storage location created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/inventory/locations/{id}
pub async fn get_location(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(STORAGE_LOCATION.view)?;
    let location = StorageLocationRepo::find_with_path(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("StorageLocation", id))?;
    Ok(Json(DataResponse { data: location }))
}

/// PUT /api/v1/inventory/locations/{id}
///
/// Member rules are checked against the merged result; a new parent must
/// not create a cycle.
pub async fn update_location(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStorageLocation>,
) -> AppResult<impl IntoResponse> {
    principal.require(STORAGE_LOCATION.change)?;
    input.validate()?;

    let current = StorageLocationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("StorageLocation", id))?;
    validate_member_location(
        input.is_member.unwrap_or(current.is_member),
        input.member_id.or(current.member_id),
    )?;
    if input.parent_id.is_some() {
        let parents = StorageLocationRepo::parent_map(&state.pool).await?;
        validate_parent(Some(id), input.parent_id, &parents)?;
    }

    StorageLocationRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("StorageLocation", id))?;
    let response = StorageLocationRepo::find_with_path(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("StorageLocation", id))?;
    Ok(Json(DataResponse { data: response }))
}

/// DELETE /api/v1/inventory/locations/{id}
///
/// Fails with 409 while child locations, stock or ledger entries reference it.
pub async fn delete_location(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(STORAGE_LOCATION.delete)?;
    if !StorageLocationRepo::delete(&state.pool, id).await? {
        return Err(not_found("StorageLocation", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/inventory/locations/provision-members
///
/// Creates a member location for each member lacking one.
pub async fn provision_member_locations(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(STORAGE_LOCATION.add)?;
    let created = StorageLocationRepo::provision_member_locations(&state.pool).await?;
    tracing::info!(created = created.len(), "Member storage locations provisioned");
    Ok(Json(DataResponse { data: created }))
}

// ---------------------------------------------------------------------------
// Stock (read-only)
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/stock
pub async fn list_stock(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<StockListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(STOCK.view)?;
    Ok(Json(DataResponse {
        data: StockRepo::list(&state.pool, &params).await?,
    }))
}

/// GET /api/v1/inventory/stock/{id}
pub async fn get_stock(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(STOCK.view)?;
    let stock = StockRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Stock", id))?;
    Ok(Json(DataResponse { data: stock }))
}

/// POST / PUT / PATCH / DELETE on /api/v1/inventory/stock[/{id}]
pub async fn stock_is_read_only() -> AppError {
    AppError::MethodNotAllowed(
        "Stock is derived from transactions and cannot be edited directly; book a transaction instead"
            .into(),
    )
}

// ---------------------------------------------------------------------------
// Transactions (append-only)
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/transactions
pub async fn list_transactions(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(TRANSACTION.view)?;
    Ok(Json(DataResponse {
        data: TransactionRepo::list(&state.pool, &params).await?,
    }))
}

/// POST /api/v1/inventory/transactions
///
/// Books the ledger entry and its stock effects atomically.
pub async fn create_transaction(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateTransaction>,
) -> AppResult<impl IntoResponse> {
    principal.require(TRANSACTION.add)?;
    if input.transaction_type == TransactionType::Discard {
        principal.require(DISCARD_ITEMS)?;
    }

    let entry = TransactionRepo::create(&state.pool, &input, Some(principal.user_id)).await?;
    tracing::info!(
        transaction_id = entry.id,
        kind = %input.transaction_type,
        quantity = entry.quantity,
        user_id = principal.user_id,
        "Transaction booked"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/v1/inventory/transactions/{id}
pub async fn get_transaction(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(TRANSACTION.view)?;
    let entry = TransactionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Transaction", id))?;
    Ok(Json(DataResponse { data: entry }))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// GET /api/v1/inventory/dashboard
///
/// `my_loans` lists stock at the caller's member location; empty when the
/// caller has no linked member or no location.
pub async fn dashboard(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[ITEM.view, STOCK.view])?;

    let my_loans = match principal.member_id(&state).await? {
        Some(member_id) => match StorageLocationRepo::find_for_member(&state.pool, member_id).await? {
            Some(location) => StockRepo::list_in_stock_at(&state.pool, location.id).await?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let dashboard = InventoryDashboard {
        total_items: ItemRepo::count(&state.pool).await?,
        total_categories: CategoryRepo::list(&state.pool).await?.len() as i64,
        total_locations: StorageLocationRepo::count(&state.pool).await?,
        total_stock: StockRepo::total_quantity(&state.pool).await?,
        recent_transactions: TransactionRepo::recent(&state.pool, DASHBOARD_RECENT_TRANSACTIONS)
            .await?,
        my_loans,
    };
    Ok(Json(DataResponse { data: dashboard }))
}
