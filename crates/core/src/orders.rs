//! Order item status workflow (codes, transitions, categories, statistics).
//!
//! Order statuses live in the `order_statuses` table but the workflow is
//! keyed on their stable `code` values defined here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ORDERED: &str = "ordered";
pub const STATUS_RECEIVED: &str = "received";
pub const STATUS_READY: &str = "ready";
pub const STATUS_DELIVERED: &str = "delivered";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_DEFECTIVE: &str = "defective";

/// All workflow codes in display order.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_ORDERED,
    STATUS_RECEIVED,
    STATUS_READY,
    STATUS_DELIVERED,
    STATUS_CANCELLED,
    STATUS_DEFECTIVE,
];

pub const ACTIVE_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_ORDERED, STATUS_RECEIVED, STATUS_READY];
pub const COMPLETED_STATUSES: &[&str] = &[STATUS_DELIVERED];
pub const TERMINATED_STATUSES: &[&str] = &[STATUS_CANCELLED, STATUS_DEFECTIVE];
/// Statuses that need someone to act (reminders are sent for these).
pub const ACTIONABLE_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_ORDERED, STATUS_DEFECTIVE];
pub const FINAL_STATUSES: &[&str] = &[STATUS_DELIVERED, STATUS_CANCELLED];

/// Code assigned to newly created order items.
pub const INITIAL_STATUS: &str = STATUS_PENDING;

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Returns the set of codes that `from_status` may transition to.
///
/// - `pending`   -> `ordered`, `cancelled`
/// - `ordered`   -> `received`, `cancelled`
/// - `received`  -> `ready`, `defective`
/// - `ready`     -> `delivered`
/// - `defective` -> `ordered` (re-order), `cancelled`
/// - `delivered`, `cancelled` are final
pub fn valid_transitions(from_status: &str) -> &'static [&'static str] {
    match from_status {
        STATUS_PENDING => &[STATUS_ORDERED, STATUS_CANCELLED],
        STATUS_ORDERED => &[STATUS_RECEIVED, STATUS_CANCELLED],
        STATUS_RECEIVED => &[STATUS_READY, STATUS_DEFECTIVE],
        STATUS_READY => &[STATUS_DELIVERED],
        STATUS_DEFECTIVE => &[STATUS_ORDERED, STATUS_CANCELLED],
        _ => &[],
    }
}

pub fn can_transition(from: &str, to: &str) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate that a status transition from `current` to `next` is allowed.
pub fn validate_transition(current: &str, next: &str) -> Result<(), CoreError> {
    if current == next {
        return Err(CoreError::Validation(format!(
            "Order item is already in status '{current}'"
        )));
    }
    let allowed = valid_transitions(current);
    if allowed.contains(&next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Cannot transition order item from '{current}' to '{next}'. Allowed transitions: {allowed:?}"
        )))
    }
}

pub fn is_final(code: &str) -> bool {
    FINAL_STATUSES.contains(&code)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Active,
    Completed,
    Terminated,
    Unknown,
}

pub fn category_of(code: &str) -> StatusCategory {
    if ACTIVE_STATUSES.contains(&code) {
        StatusCategory::Active
    } else if COMPLETED_STATUSES.contains(&code) {
        StatusCategory::Completed
    } else if TERMINATED_STATUSES.contains(&code) {
        StatusCategory::Terminated
    } else {
        StatusCategory::Unknown
    }
}

// ---------------------------------------------------------------------------
// Status side effects
// ---------------------------------------------------------------------------

/// Which date columns a transition into `new_code` stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateStamps {
    pub received: bool,
    pub delivered: bool,
}

pub fn date_stamps(new_code: &str) -> DateStamps {
    DateStamps {
        received: new_code == STATUS_RECEIVED,
        delivered: new_code == STATUS_DELIVERED,
    }
}

/// History note used when the caller gives none.
pub fn default_history_note(from_name: Option<&str>, to_name: &str) -> String {
    match from_name {
        Some(from) => format!("Status changed from {from} to {to_name}"),
        None => format!("Status set to {to_name}"),
    }
}

// ---------------------------------------------------------------------------
// Bulk validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockedItem {
    pub item_id: DbId,
    pub current_status: String,
    pub reason: String,
}

/// Outcome of validating one target status against many items.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkValidation {
    pub allowed: Vec<DbId>,
    pub blocked: Vec<BlockedItem>,
    pub errors: Vec<String>,
}

/// Split `items` (id, current code) into those that may move to `target`
/// and those that may not.
pub fn validate_bulk(items: &[(DbId, String)], target: &str) -> BulkValidation {
    let mut result = BulkValidation::default();
    if !VALID_STATUSES.contains(&target) {
        result.errors.push(format!("Unknown target status '{target}'"));
        return result;
    }
    for (item_id, current) in items {
        match validate_transition(current, target) {
            Ok(()) => result.allowed.push(*item_id),
            Err(err) => result.blocked.push(BlockedItem {
                item_id: *item_id,
                current_status: current.clone(),
                reason: match err {
                    CoreError::Validation(msg) => msg,
                    other => other.to_string(),
                },
            }),
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Quantity-weighted status breakdown.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatusStatistics {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_category: BTreeMap<StatusCategory, i64>,
    pub completion_rate: f64,
}

/// Aggregate `(status code, quantity)` rows.
pub fn status_statistics<'a>(rows: impl IntoIterator<Item = (&'a str, i64)>) -> StatusStatistics {
    let mut stats = StatusStatistics::default();
    for (code, quantity) in rows {
        stats.total += quantity;
        *stats.by_status.entry(code.to_string()).or_default() += quantity;
        *stats.by_category.entry(category_of(code)).or_default() += quantity;
    }
    let completed = stats
        .by_category
        .get(&StatusCategory::Completed)
        .copied()
        .unwrap_or(0);
    stats.completion_rate = if stats.total > 0 {
        (completed as f64 / stats.total as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };
    stats
}

// ---------------------------------------------------------------------------
// Workflow description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowNode {
    pub code: &'static str,
    pub category: StatusCategory,
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowEdge {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDescription {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    pub initial: &'static str,
}

/// Nodes and edges of the workflow graph for rendering.
pub fn workflow_description() -> WorkflowDescription {
    let nodes = VALID_STATUSES
        .iter()
        .map(|code| WorkflowNode {
            code,
            category: category_of(code),
            is_final: is_final(code),
        })
        .collect();
    let edges = VALID_STATUSES
        .iter()
        .flat_map(|from| {
            valid_transitions(from)
                .iter()
                .map(move |to| WorkflowEdge { from, to })
        })
        .collect();
    WorkflowDescription {
        nodes,
        edges,
        initial: INITIAL_STATUS,
    }
}

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Parse a comma-separated size list, dropping blanks.
pub fn parse_sizes(available_sizes: &str) -> Vec<String> {
    available_sizes
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// A size is required (and must be listed) when the item has sizes.
pub fn validate_size(
    has_sizes: bool,
    available_sizes: &str,
    size: Option<&str>,
) -> Result<(), CoreError> {
    let size = size.map(str::trim).filter(|s| !s.is_empty());
    if !has_sizes {
        return Ok(());
    }
    let Some(size) = size else {
        return Err(CoreError::Validation("A size is required for this item".into()));
    };
    let sizes = parse_sizes(available_sizes);
    if sizes.is_empty() || sizes.iter().any(|s| s == size) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Size '{size}' is not available. Available sizes: {}",
            sizes.join(", ")
        )))
    }
}
