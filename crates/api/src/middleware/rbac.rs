//! Role-based extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use clubhouse_core::error::CoreError;

use super::permissions::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a superuser. Checked against the current user row, so a revoked
/// superuser flag takes effect before the access token expires.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(admin): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_superuser() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(principal))
    }
}
