//! Handlers for notification preferences, delivery logs and email templates.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::permissions::{EMAIL_TEMPLATE, NOTIFICATION_LOG};
use clubhouse_core::types::DbId;
use clubhouse_db::models::notification::{
    CreateEmailTemplate, NotificationLogListParams, UpdateEmailTemplate,
    UpdateNotificationPreference, NOTIFICATION_TYPES,
};
use clubhouse_db::repositories::{
    EmailTemplateRepo, NotificationLogRepo, NotificationPreferenceRepo,
};
use validator::Validate;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::permissions::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

fn check_template_type(template_type: &str) -> AppResult<()> {
    if NOTIFICATION_TYPES.contains(&template_type) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Unknown template type '{template_type}'. Expected one of: {}",
            NOTIFICATION_TYPES.join(", ")
        ))))
    }
}

// ---------------------------------------------------------------------------
// Own preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
///
/// Created with defaults on first access.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let prefs = NotificationPreferenceRepo::get_or_create(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNotificationPreference>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let prefs = NotificationPreferenceRepo::update(&state.pool, auth.user_id, &input).await?;
    tracing::debug!(user_id = auth.user_id, "Notification preferences updated");
    Ok(Json(DataResponse { data: prefs }))
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/logs
pub async fn list_logs(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<NotificationLogListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(NOTIFICATION_LOG.view)?;
    Ok(Json(DataResponse {
        data: NotificationLogRepo::list(&state.pool, &params).await?,
    }))
}

/// GET /api/v1/notifications/logs/stats
///
/// Number of log rows per delivery status.
pub async fn log_stats(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(NOTIFICATION_LOG.view)?;
    let counts: BTreeMap<String, i64> = NotificationLogRepo::status_counts(&state.pool)
        .await?
        .into_iter()
        .collect();
    Ok(Json(DataResponse { data: counts }))
}

/// GET /api/v1/notifications/logs/{id}
pub async fn get_log(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(NOTIFICATION_LOG.view)?;
    let log = NotificationLogRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("NotificationLog", id))?;
    Ok(Json(DataResponse { data: log }))
}

/// POST /api/v1/notifications/logs/{id}/retry
///
/// Re-sends a failed notification with its stored content. The returned log
/// reflects the outcome of the new attempt.
pub async fn retry_log(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(NOTIFICATION_LOG.change)?;
    let log = state.notifications.retry(id).await?;
    tracing::info!(
        log_id = id,
        status = %log.status,
        retry_count = log.retry_count,
        user_id = principal.user_id,
        "Notification retried"
    );
    Ok(Json(DataResponse { data: log }))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/templates
pub async fn list_templates(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(EMAIL_TEMPLATE.view)?;
    Ok(Json(DataResponse {
        data: EmailTemplateRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/notifications/templates
pub async fn create_template(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateEmailTemplate>,
) -> AppResult<impl IntoResponse> {
    principal.require(EMAIL_TEMPLATE.add)?;
    input.validate()?;
    check_template_type(&input.template_type)?;
    let template = EmailTemplateRepo::create(&state.pool, &input).await?;
    tracing::info!(
        template_id = template.id,
        template_type = %template.template_type,
        "Email template created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/notifications/templates/{id}
pub async fn get_template(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(EMAIL_TEMPLATE.view)?;
    let template = EmailTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("EmailTemplate", id))?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/notifications/templates/{id}
pub async fn update_template(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEmailTemplate>,
) -> AppResult<impl IntoResponse> {
    principal.require(EMAIL_TEMPLATE.change)?;
    input.validate()?;
    let template = EmailTemplateRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("EmailTemplate", id))?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/notifications/templates/{id}
///
/// The built-in default takes over for the type again.
pub async fn delete_template(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(EMAIL_TEMPLATE.delete)?;
    if !EmailTemplateRepo::delete(&state.pool, id).await? {
        return Err(not_found("EmailTemplate", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_types_are_checked() {
        assert!(check_template_type("status_update").is_ok());
        assert!(check_template_type("order_summary").is_ok());
        assert!(check_template_type("birthday_greeting").is_err());
    }
}
