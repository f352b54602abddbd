//! Inventory models: categories, items, variants, storage locations, stock
//! and the transaction ledger.

use clubhouse_core::inventory::TransactionType;
use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A row from the `inventory_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    /// Optional JSON description of the attributes items in this category carry.
    pub schema: Option<Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub schema: Option<Value>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A row from the `items` table plus its derived stock total.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: DbId,
    pub name: String,
    pub category_id: DbId,
    pub category_name: String,
    pub base_unit: String,
    pub attributes: Value,
    pub is_variant_parent: bool,
    pub size: Option<String>,
    pub identifier1: Option<String>,
    pub identifier2: Option<String>,
    pub rented_by_id: Option<DbId>,
    /// Sum of own stock, or of all variants' stock for variant parents.
    pub total_stock: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: DbId,
    pub base_unit: Option<String>,
    pub attributes: Option<Value>,
    #[serde(default)]
    pub is_variant_parent: bool,
    pub size: Option<String>,
    pub identifier1: Option<String>,
    pub identifier2: Option<String>,
    pub rented_by_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<DbId>,
    pub base_unit: Option<String>,
    pub attributes: Option<Value>,
    pub is_variant_parent: Option<bool>,
    pub size: Option<String>,
    pub identifier1: Option<String>,
    pub identifier2: Option<String>,
    pub rented_by_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemListParams {
    pub category_id: Option<DbId>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// A row from the `item_variants` table joined with parent data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemVariant {
    pub id: DbId,
    pub parent_item_id: DbId,
    pub parent_name: String,
    #[serde(skip)]
    pub parent_attributes: Value,
    pub variant_attributes: Value,
    pub sku: Option<String>,
    pub total_stock: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Variant with derived display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ItemVariantResponse {
    #[serde(flatten)]
    pub variant: ItemVariant,
    pub display_name: String,
    pub combined_attributes: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemVariant {
    pub parent_item_id: DbId,
    #[serde(default = "empty_object")]
    pub variant_attributes: Value,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemVariant {
    pub variant_attributes: Option<Value>,
    pub sku: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

// ---------------------------------------------------------------------------
// Storage locations
// ---------------------------------------------------------------------------

/// A row from the `storage_locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StorageLocation {
    pub id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub is_member: bool,
    pub member_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Location with its rendered path and depth.
#[derive(Debug, Clone, Serialize)]
pub struct StorageLocationResponse {
    #[serde(flatten)]
    pub location: StorageLocation,
    pub full_path: String,
    pub level: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStorageLocation {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub parent_id: Option<DbId>,
    #[serde(default)]
    pub is_member: bool,
    pub member_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateStorageLocation {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub parent_id: Option<DbId>,
    pub is_member: Option<bool>,
    pub member_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// A row from the `stock` table with display names resolved.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Stock {
    pub id: DbId,
    pub item_id: Option<DbId>,
    pub item_variant_id: Option<DbId>,
    pub item_name: String,
    pub location_id: DbId,
    pub location_name: String,
    pub quantity: i32,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockListParams {
    pub location_id: Option<DbId>,
    pub item_id: Option<DbId>,
    pub item_variant_id: Option<DbId>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// A row from the `inventory_transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryTransaction {
    pub id: DbId,
    pub transaction_type: String,
    pub item_id: Option<DbId>,
    pub item_variant_id: Option<DbId>,
    pub source_id: Option<DbId>,
    pub target_id: Option<DbId>,
    pub quantity: i32,
    pub date: Timestamp,
    pub note: Option<String>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransaction {
    pub transaction_type: TransactionType,
    pub item_id: Option<DbId>,
    pub item_variant_id: Option<DbId>,
    pub source_id: Option<DbId>,
    pub target_id: Option<DbId>,
    pub quantity: i32,
    /// Defaults to now.
    pub date: Option<Timestamp>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    pub transaction_type: Option<String>,
    pub item_id: Option<DbId>,
    pub item_variant_id: Option<DbId>,
    /// Matches either source or target.
    pub location_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct InventoryDashboard {
    pub total_items: i64,
    pub total_categories: i64,
    pub total_locations: i64,
    pub total_stock: i64,
    pub recent_transactions: Vec<InventoryTransaction>,
    /// Stock held at the caller's member location.
    pub my_loans: Vec<Stock>,
}
