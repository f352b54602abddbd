//! Repositories for settings categories and stored preference values.

use clubhouse_core::preferences::{self, PreferenceKey};
use clubhouse_core::types::DbId;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::settings::{SettingsCategory, StoredPreference};

const CATEGORY_COLUMNS: &str = "id, name, code, description, created_at, updated_at";

pub struct SettingsCategoryRepo;

impl SettingsCategoryRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<SettingsCategory>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM settings_categories ORDER BY id");
        sqlx::query_as::<_, SettingsCategory>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<SettingsCategory>, sqlx::Error> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM settings_categories WHERE code = $1");
        sqlx::query_as::<_, SettingsCategory>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }
}

const PREF_COLUMNS: &str = "section, name, value, updated_by_id, updated_at";

/// Stored preference values. Keys absent from the table resolve to the
/// registry default.
pub struct PreferenceRepo;

impl PreferenceRepo {
    pub async fn list_section(
        pool: &PgPool,
        section: &str,
    ) -> Result<Vec<StoredPreference>, sqlx::Error> {
        let query = format!(
            "SELECT {PREF_COLUMNS} FROM preferences WHERE section = $1 ORDER BY name"
        );
        sqlx::query_as::<_, StoredPreference>(&query)
            .bind(section)
            .fetch_all(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        key: PreferenceKey,
    ) -> Result<Option<StoredPreference>, sqlx::Error> {
        let query = format!("SELECT {PREF_COLUMNS} FROM preferences WHERE section = $1 AND name = $2");
        sqlx::query_as::<_, StoredPreference>(&query)
            .bind(key.0)
            .bind(key.1)
            .fetch_optional(pool)
            .await
    }

    /// Effective value of a registered preference.
    pub async fn get(pool: &PgPool, key: PreferenceKey) -> Result<Value, sqlx::Error> {
        let def = preferences::lookup(key);
        Ok(Self::find(pool, key)
            .await?
            .map(|p| p.value)
            .unwrap_or_else(|| def.default.to_json()))
    }

    pub async fn get_string(pool: &PgPool, key: PreferenceKey) -> Result<String, sqlx::Error> {
        Ok(match Self::get(pool, key).await? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub async fn get_i64(pool: &PgPool, key: PreferenceKey) -> Result<i64, sqlx::Error> {
        let def = preferences::lookup(key);
        let value = Self::get(pool, key).await?;
        Ok(value
            .as_i64()
            .or_else(|| def.default.to_json().as_i64())
            .unwrap_or_default())
    }

    pub async fn get_bool(pool: &PgPool, key: PreferenceKey) -> Result<bool, sqlx::Error> {
        let def = preferences::lookup(key);
        let value = Self::get(pool, key).await?;
        Ok(value
            .as_bool()
            .or_else(|| def.default.to_json().as_bool())
            .unwrap_or_default())
    }

    /// Store a value that has already been validated for its kind.
    pub async fn upsert(
        pool: &PgPool,
        key: PreferenceKey,
        value: &Value,
        updated_by_id: Option<DbId>,
    ) -> Result<StoredPreference, sqlx::Error> {
        let query = format!(
            "INSERT INTO preferences (section, name, value, updated_by_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_preferences_section_name
             DO UPDATE SET value = EXCLUDED.value, updated_by_id = EXCLUDED.updated_by_id
             RETURNING {PREF_COLUMNS}"
        );
        sqlx::query_as::<_, StoredPreference>(&query)
            .bind(key.0)
            .bind(key.1)
            .bind(value)
            .bind(updated_by_id)
            .fetch_one(pool)
            .await
    }

    /// Remove a stored value so the default applies again.
    pub async fn reset(pool: &PgPool, key: PreferenceKey) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM preferences WHERE section = $1 AND name = $2")
            .bind(key.0)
            .bind(key.1)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
