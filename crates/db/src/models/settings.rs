//! Settings category and stored preference models.

use clubhouse_core::types::{DbId, Timestamp};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `settings_categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SettingsCategory {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A stored override from the `preferences` table.
#[derive(Debug, Clone, FromRow)]
pub struct StoredPreference {
    pub section: String,
    pub name: String,
    pub value: Value,
    pub updated_by_id: Option<DbId>,
    pub updated_at: Timestamp,
}

/// A preference as exposed by the settings API.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceValue {
    pub section: String,
    pub name: String,
    pub identifier: String,
    pub kind: clubhouse_core::preferences::PreferenceKind,
    pub label: String,
    /// `None` for secret values.
    pub value: Option<Value>,
    pub default: Value,
    pub is_default: bool,
    pub is_secret: bool,
    /// For secrets: whether a non-empty value is stored.
    pub is_set: bool,
}
