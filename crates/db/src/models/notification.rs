//! Notification preference, log and email template models.

use clubhouse_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use validator::Validate;

pub const NOTIFICATION_ORDER_CREATED: &str = "order_created";
pub const NOTIFICATION_STATUS_UPDATE: &str = "status_update";
pub const NOTIFICATION_BULK_UPDATE: &str = "bulk_update";
pub const NOTIFICATION_PENDING_REMINDER: &str = "pending_reminder";
pub const NOTIFICATION_DAILY_SUMMARY: &str = "daily_summary";
pub const NOTIFICATION_WEEKLY_REPORT: &str = "weekly_report";
pub const NOTIFICATION_ORDER_SUMMARY: &str = "order_summary";

pub const NOTIFICATION_TYPES: &[&str] = &[
    NOTIFICATION_ORDER_CREATED,
    NOTIFICATION_STATUS_UPDATE,
    NOTIFICATION_BULK_UPDATE,
    NOTIFICATION_PENDING_REMINDER,
    NOTIFICATION_DAILY_SUMMARY,
    NOTIFICATION_WEEKLY_REPORT,
    NOTIFICATION_ORDER_SUMMARY,
];

pub const LOG_STATUS_PENDING: &str = "pending";
pub const LOG_STATUS_SENT: &str = "sent";
pub const LOG_STATUS_FAILED: &str = "failed";

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    pub email_new_orders: bool,
    pub email_status_updates: bool,
    pub email_bulk_updates: bool,
    pub email_pending_reminders: bool,
    pub email_daily_summary: bool,
    pub email_weekly_report: bool,
    pub reminder_frequency_days: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateNotificationPreference {
    pub email_new_orders: Option<bool>,
    pub email_status_updates: Option<bool>,
    pub email_bulk_updates: Option<bool>,
    pub email_pending_reminders: Option<bool>,
    pub email_daily_summary: Option<bool>,
    pub email_weekly_report: Option<bool>,
    #[validate(range(min = 1, max = 365))]
    pub reminder_frequency_days: Option<i32>,
}

/// A recipient candidate: user email plus the matching preference flag.
///
/// `opted_in` is `None` when the user has no preference row yet.
#[derive(Debug, Clone, FromRow)]
pub struct RecipientCandidate {
    pub user_id: Option<DbId>,
    pub email: String,
    pub opted_in: Option<bool>,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// A row from the `notification_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationLog {
    pub id: DbId,
    pub notification_type: String,
    pub recipient_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub status: String,
    pub order_id: Option<DbId>,
    pub order_item_id: Option<DbId>,
    pub sent_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub additional_data: Value,
    pub retry_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a pending send attempt.
#[derive(Debug, Clone)]
pub struct CreateNotificationLog {
    pub notification_type: String,
    pub recipient_email: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub order_id: Option<DbId>,
    pub order_item_id: Option<DbId>,
    pub additional_data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationLogListParams {
    pub status: Option<String>,
    pub notification_type: Option<String>,
    pub order_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A row from the `email_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailTemplate {
    pub id: DbId,
    pub name: String,
    pub template_type: String,
    pub subject_template: String,
    pub html_template: String,
    pub text_template: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmailTemplate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub template_type: String,
    #[validate(length(min = 1, max = 200))]
    pub subject_template: String,
    #[serde(default)]
    pub html_template: String,
    #[serde(default)]
    pub text_template: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEmailTemplate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject_template: Option<String>,
    pub html_template: Option<String>,
    pub text_template: Option<String>,
    pub is_active: Option<bool>,
}
