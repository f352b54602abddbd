//! Permission-aware caller extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use clubhouse_core::error::CoreError;
use clubhouse_core::permissions::{PermissionSet, SettingsAccess};
use clubhouse_core::types::DbId;
use clubhouse_db::repositories::{MemberRepo, PermissionRepo, UserRepo};

use super::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The authenticated caller with the permission set loaded from the database.
///
/// Rejects tokens of users that were deleted or deactivated after issue.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: DbId,
    /// Display name recorded on notifications ("changed by").
    pub name: String,
    perms: PermissionSet,
}

impl Principal {
    pub fn is_superuser(&self) -> bool {
        self.perms.is_superuser()
    }

    pub fn has(&self, perm: &str) -> bool {
        self.perms.has(perm)
    }

    pub fn has_any(&self, perms: &[&str]) -> bool {
        self.perms.has_any(perms)
    }

    /// 403 unless the caller holds `perm`.
    pub fn require(&self, perm: &str) -> AppResult<()> {
        if self.has(perm) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "Missing permission '{perm}'"
            ))))
        }
    }

    /// 403 unless the caller holds at least one of `perms`.
    pub fn require_any(&self, perms: &[&str]) -> AppResult<()> {
        if self.has_any(perms) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "Requires one of: {}",
                perms.join(", ")
            ))))
        }
    }

    pub fn require_settings(&self, category_code: &str, access: SettingsAccess) -> AppResult<()> {
        if self.perms.can_access_settings(category_code, access) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "No access to '{category_code}' settings"
            ))))
        }
    }

    pub fn can_access_settings(&self, category_code: &str, access: SettingsAccess) -> bool {
        self.perms.can_access_settings(category_code, access)
    }

    pub fn granted(&self) -> Vec<String> {
        self.perms.granted()
    }

    /// The member record linked to the caller, if any.
    pub async fn member_id(&self, state: &AppState) -> AppResult<Option<DbId>> {
        Ok(MemberRepo::find_by_user(&state.pool, self.user_id)
            .await?
            .map(|m| m.id))
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let user = UserRepo::find_by_id(&state.pool, auth.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("User is no longer active".into()))
            })?;
        let granted = PermissionRepo::list_for_user(&state.pool, user.id).await?;

        Ok(Principal {
            user_id: user.id,
            name: user.display_name(),
            perms: PermissionSet::new(user.is_superuser, granted),
        })
    }
}
