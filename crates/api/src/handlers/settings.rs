//! Handlers for runtime settings.
//!
//! Settings are grouped into sections, one per settings category. Access is
//! granted per category and per direction (view or change); superusers and
//! holders of the `*_all_settings` permissions see every category.

use std::collections::{BTreeMap, HashMap};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::permissions::SettingsAccess;
use clubhouse_core::preferences::{
    self, PreferenceDef, GENERAL_TITLE, ORDERS_EQUIPMENT_MANAGER_EMAIL,
};
use clubhouse_db::models::settings::{PreferenceValue, StoredPreference};
use clubhouse_db::repositories::{PreferenceRepo, SettingsCategoryRepo};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::permissions::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

fn present(def: &PreferenceDef, stored: Option<&StoredPreference>) -> PreferenceValue {
    let default = def.default.to_json();
    let value = stored.map(|p| p.value.clone()).unwrap_or_else(|| default.clone());
    let is_set = match &value {
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        _ => true,
    };
    PreferenceValue {
        section: def.section.to_string(),
        name: def.name.to_string(),
        identifier: def.identifier(),
        kind: def.kind,
        label: def.label.to_string(),
        value: (!def.secret).then_some(value),
        default,
        is_default: stored.is_none(),
        is_secret: def.secret,
        is_set,
    }
}

fn check_section(section: &str) -> AppResult<()> {
    if preferences::is_section(section) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Unknown settings section '{section}'. Expected one of: {}",
            preferences::SECTIONS.join(", ")
        )))
    }
}

async fn section_values(state: &AppState, section: &str) -> AppResult<Vec<PreferenceValue>> {
    let stored: HashMap<String, StoredPreference> =
        PreferenceRepo::list_section(&state.pool, section)
            .await?
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
    Ok(preferences::in_section(section)
        .map(|def| present(def, stored.get(def.name)))
        .collect())
}

/// Validate every submitted value before anything is written.
fn validate_section_update(
    section: &str,
    input: &BTreeMap<String, Value>,
) -> Result<Vec<(&'static PreferenceDef, Value)>, CoreError> {
    input
        .iter()
        .map(|(name, value)| {
            let def = preferences::find(section, name).ok_or_else(|| {
                CoreError::Validation(format!("Unknown setting '{section}__{name}'"))
            })?;
            Ok((def, preferences::validate_value(def, value)?))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AppSettings {
    pub app_name: String,
    pub equipment_manager_email: String,
}

/// GET /api/v1/settings/app
///
/// Open to every authenticated user.
pub async fn app_settings(
    _principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: AppSettings {
            app_name: PreferenceRepo::get_string(&state.pool, GENERAL_TITLE).await?,
            equipment_manager_email: PreferenceRepo::get_string(
                &state.pool,
                ORDERS_EQUIPMENT_MANAGER_EMAIL,
            )
            .await?,
        },
    }))
}

// ---------------------------------------------------------------------------
// Categories and sections
// ---------------------------------------------------------------------------

/// GET /api/v1/settings/categories
///
/// Only the categories the caller may view.
pub async fn list_categories(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let categories: Vec<_> = SettingsCategoryRepo::list(&state.pool)
        .await?
        .into_iter()
        .filter(|c| principal.can_access_settings(&c.code, SettingsAccess::View))
        .collect();
    Ok(Json(DataResponse { data: categories }))
}

/// GET /api/v1/settings/{section}
pub async fn get_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> AppResult<impl IntoResponse> {
    check_section(&section)?;
    principal.require_settings(&section, SettingsAccess::View)?;
    Ok(Json(DataResponse {
        data: section_values(&state, &section).await?,
    }))
}

/// PUT /api/v1/settings/{section}
///
/// Body is a `{ name: value }` map; names not sent keep their value.
pub async fn update_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
    Json(input): Json<BTreeMap<String, Value>>,
) -> AppResult<impl IntoResponse> {
    check_section(&section)?;
    principal.require_settings(&section, SettingsAccess::Change)?;
    let updates = validate_section_update(&section, &input)?;

    for (def, value) in &updates {
        PreferenceRepo::upsert(&state.pool, def.key(), value, Some(principal.user_id)).await?;
    }
    tracing::info!(
        section = %section,
        changed = updates.len(),
        user_id = principal.user_id,
        "Settings updated"
    );
    Ok(Json(DataResponse {
        data: section_values(&state, &section).await?,
    }))
}

/// POST /api/v1/settings/{section}/reset
///
/// Drops every stored value of the section so the defaults apply again.
pub async fn reset_section(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> AppResult<impl IntoResponse> {
    check_section(&section)?;
    principal.require_settings(&section, SettingsAccess::Change)?;
    for def in preferences::in_section(&section) {
        PreferenceRepo::reset(&state.pool, def.key()).await?;
    }
    tracing::info!(section = %section, user_id = principal.user_id, "Settings reset");
    Ok(Json(DataResponse {
        data: section_values(&state, &section).await?,
    }))
}

/// DELETE /api/v1/settings/{section}/{name}
///
/// Resets one value to its default.
pub async fn reset_value(
    principal: Principal,
    State(state): State<AppState>,
    Path((section, name)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    check_section(&section)?;
    principal.require_settings(&section, SettingsAccess::Change)?;
    let def = preferences::find(&section, &name).ok_or_else(|| {
        CoreError::Validation(format!("Unknown setting '{section}__{name}'"))
    })?;
    PreferenceRepo::reset(&state.pool, def.key()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_core::preferences::{lookup, EMAIL_HOST_PASSWORD, MEMBERS_ALERT_THRESHOLD};
    use serde_json::json;

    fn stored(def: &PreferenceDef, value: Value) -> StoredPreference {
        StoredPreference {
            section: def.section.into(),
            name: def.name.into(),
            value,
            updated_by_id: None,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn defaults_apply_without_stored_value() {
        let def = lookup(MEMBERS_ALERT_THRESHOLD);
        let v = present(def, None);
        assert_eq!(v.value, Some(json!(3)));
        assert!(v.is_default);
        assert_eq!(v.identifier, "members__alert_threshold");
    }

    #[test]
    fn stored_value_overrides_default() {
        let def = lookup(MEMBERS_ALERT_THRESHOLD);
        let row = stored(def, json!(5));
        let v = present(def, Some(&row));
        assert_eq!(v.value, Some(json!(5)));
        assert_eq!(v.default, json!(3));
        assert!(!v.is_default);
    }

    #[test]
    fn secrets_are_never_returned() {
        let def = lookup(EMAIL_HOST_PASSWORD);
        let unset = present(def, None);
        assert_eq!(unset.value, None);
        assert!(!unset.is_set);

        let row = stored(def, json!("hunter22"));
        let set = present(def, Some(&row));
        assert_eq!(set.value, None);
        assert!(set.is_secret);
        assert!(set.is_set);
    }

    #[test]
    fn updates_are_validated_against_the_section() {
        let mut input = BTreeMap::new();
        input.insert("alert_threshold".to_string(), json!("4"));
        let updates = validate_section_update("members", &input).unwrap();
        assert_eq!(updates[0].1, json!(4));

        input.insert("email_host".to_string(), json!("smtp.example.org"));
        assert!(validate_section_update("members", &input).is_err());

        let mut bad = BTreeMap::new();
        bad.insert("alert_threshold".to_string(), json!(0));
        assert!(validate_section_update("members", &bad).is_err());
    }
}
