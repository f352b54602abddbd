//! Equipment order models: orderable catalog, statuses, orders, order items
//! and the status history.

use clubhouse_core::orders::{parse_sizes, BulkValidation};
use clubhouse_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Orderable items
// ---------------------------------------------------------------------------

/// A row from the `orderable_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderableItem {
    pub id: DbId,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub has_sizes: bool,
    pub available_sizes: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderableItemResponse {
    #[serde(flatten)]
    pub item: OrderableItem,
    pub sizes: Vec<String>,
}

impl From<OrderableItem> for OrderableItemResponse {
    fn from(item: OrderableItem) -> Self {
        Self {
            sizes: parse_sizes(&item.available_sizes),
            item,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderableItem {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    #[serde(default)]
    pub has_sizes: bool,
    #[serde(default)]
    pub available_sizes: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrderableItem {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub has_sizes: Option<bool>,
    pub available_sizes: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// A row from the `order_statuses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderStatus {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub color: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderStatus {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrderStatus {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// A row from the `orders` table joined with member and orderer names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub member_id: DbId,
    pub member_name: String,
    pub member_email: Option<String>,
    pub ordered_by_id: Option<DbId>,
    pub ordered_by_name: Option<String>,
    pub order_date: Timestamp,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `order_items` table joined with item and status data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub item_id: DbId,
    pub item_name: String,
    pub size: Option<String>,
    pub quantity: i32,
    pub status_id: DbId,
    pub status_code: String,
    pub status_name: String,
    pub status_color: String,
    pub received_date: Option<Date>,
    pub delivered_date: Option<Date>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderItem {
    pub item_id: DbId,
    pub size: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrder {
    pub member_id: DbId,
    pub notes: Option<String>,
    #[validate(length(min = 1), nested)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrder {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrderItem {
    pub size: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListParams {
    pub member_id: Option<DbId>,
    /// Only orders with at least one item in this status code.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItemListParams {
    pub status: Option<String>,
    pub member_id: Option<DbId>,
    pub item_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

/// Payload for changing one order item's status.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    /// Target status code.
    pub status: String,
    pub notes: Option<String>,
}

/// Payload for changing several order items at once.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkStatusRequest {
    #[validate(length(min = 1))]
    pub item_ids: Vec<DbId>,
    pub status: String,
    pub notes: Option<String>,
}

/// A row from the `order_item_status_history` table with status names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItemStatusHistory {
    pub id: DbId,
    pub order_item_id: DbId,
    pub from_status_id: Option<DbId>,
    pub from_status_name: Option<String>,
    pub to_status_id: DbId,
    pub to_status_name: String,
    pub changed_by_id: Option<DbId>,
    pub changed_at: Timestamp,
    pub notes: Option<String>,
}

/// `(status code, quantity)` aggregate row.
#[derive(Debug, Clone, FromRow)]
pub struct StatusQuantity {
    pub code: String,
    pub quantity: i64,
}

/// Result of a single applied status change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub item: OrderItem,
    pub from_code: String,
    pub from_name: String,
}

/// Outcome of a bulk status update.
#[derive(Debug, Clone, Serialize)]
pub struct BulkStatusResult {
    #[serde(flatten)]
    pub validation: BulkValidation,
    pub updated: Vec<OrderItem>,
}

// ---------------------------------------------------------------------------
// Reminders and summaries
// ---------------------------------------------------------------------------

/// Body of `POST /orders/reminders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderRequest {
    /// Only orders older than this many days; defaults to 7.
    pub days: Option<i64>,
}

/// Body of `POST /orders/summary`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SummaryRequest {
    /// Falls back to the `orders.equipment_manager_email` setting.
    #[validate(email)]
    pub recipient: Option<String>,
    /// Status codes to include; defaults to `pending`.
    pub statuses: Option<Vec<String>>,
}

/// Aggregated quantity for one orderable item and size.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShoppingListRow {
    pub item_id: DbId,
    pub item_name: String,
    pub category: String,
    pub size: Option<String>,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: Option<i32>) -> CreateOrderItem {
        CreateOrderItem {
            item_id: 1,
            size: None,
            quantity,
            notes: None,
        }
    }

    #[test]
    fn order_needs_at_least_one_item() {
        let order = CreateOrder {
            member_id: 1,
            notes: None,
            items: vec![],
        };
        let errors = order.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn item_quantities_are_validated() {
        let mut order = CreateOrder {
            member_id: 1,
            notes: None,
            items: vec![item(None), item(Some(2))],
        };
        assert!(order.validate().is_ok());

        order.items.push(item(Some(0)));
        assert!(order.validate().is_err());
    }
}
