//! Repositories for notification preferences, the delivery log and email
//! templates.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{
    CreateEmailTemplate, CreateNotificationLog, EmailTemplate, NotificationLog,
    NotificationLogListParams, NotificationPreference, RecipientCandidate, UpdateEmailTemplate,
    UpdateNotificationPreference, LOG_STATUS_FAILED, LOG_STATUS_PENDING, LOG_STATUS_SENT,
    NOTIFICATION_BULK_UPDATE, NOTIFICATION_DAILY_SUMMARY, NOTIFICATION_ORDER_CREATED,
    NOTIFICATION_PENDING_REMINDER, NOTIFICATION_STATUS_UPDATE, NOTIFICATION_WEEKLY_REPORT,
};
use crate::{clamp_limit, clamp_offset};

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

const PREF_COLUMNS: &str = "id, user_id, email_new_orders, email_status_updates, \
    email_bulk_updates, email_pending_reminders, email_daily_summary, email_weekly_report, \
    reminder_frequency_days, created_at, updated_at";

/// Preference column gating a notification type. `None` means the type is
/// not subject to user preferences.
pub fn preference_column(notification_type: &str) -> Option<&'static str> {
    match notification_type {
        NOTIFICATION_ORDER_CREATED => Some("email_new_orders"),
        NOTIFICATION_STATUS_UPDATE => Some("email_status_updates"),
        NOTIFICATION_BULK_UPDATE => Some("email_bulk_updates"),
        NOTIFICATION_PENDING_REMINDER => Some("email_pending_reminders"),
        NOTIFICATION_DAILY_SUMMARY => Some("email_daily_summary"),
        NOTIFICATION_WEEKLY_REPORT => Some("email_weekly_report"),
        _ => None,
    }
}

pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// The preference row of a user, created with defaults on first access.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<NotificationPreference, sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_preferences (user_id) VALUES ($1)
             ON CONFLICT ON CONSTRAINT uq_notification_preferences_user DO NOTHING",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        let query = format!("SELECT {PREF_COLUMNS} FROM notification_preferences WHERE user_id = $1");
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateNotificationPreference,
    ) -> Result<NotificationPreference, sqlx::Error> {
        Self::get_or_create(pool, user_id).await?;
        let query = format!(
            "UPDATE notification_preferences SET
                email_new_orders = COALESCE($2, email_new_orders),
                email_status_updates = COALESCE($3, email_status_updates),
                email_bulk_updates = COALESCE($4, email_bulk_updates),
                email_pending_reminders = COALESCE($5, email_pending_reminders),
                email_daily_summary = COALESCE($6, email_daily_summary),
                email_weekly_report = COALESCE($7, email_weekly_report),
                reminder_frequency_days = COALESCE($8, reminder_frequency_days)
             WHERE user_id = $1
             RETURNING {PREF_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(input.email_new_orders)
            .bind(input.email_status_updates)
            .bind(input.email_bulk_updates)
            .bind(input.email_pending_reminders)
            .bind(input.email_daily_summary)
            .bind(input.email_weekly_report)
            .bind(input.reminder_frequency_days)
            .fetch_one(pool)
            .await
    }

    /// Active staff users with an email, plus their flag for `notification_type`.
    pub async fn staff_candidates(
        pool: &PgPool,
        notification_type: &str,
    ) -> Result<Vec<RecipientCandidate>, sqlx::Error> {
        let flag = flag_expr(notification_type);
        let query = format!(
            "SELECT u.id AS user_id, u.email, {flag} AS opted_in
             FROM users u
             LEFT JOIN notification_preferences p ON p.user_id = u.id
             WHERE u.is_active = true AND (u.is_staff = true OR u.is_superuser = true)
               AND u.email <> ''
             ORDER BY u.id"
        );
        sqlx::query_as::<_, RecipientCandidate>(&query)
            .fetch_all(pool)
            .await
    }

    /// The member's email and the ordering user's email for an order.
    ///
    /// The member address is gated by the preferences of the member's linked
    /// user, if any.
    pub async fn order_candidates(
        pool: &PgPool,
        order_id: DbId,
        notification_type: &str,
    ) -> Result<Vec<RecipientCandidate>, sqlx::Error> {
        let flag = flag_expr(notification_type);
        let query = format!(
            "SELECT m.user_id, m.email, {flag} AS opted_in
             FROM orders o
             JOIN members m ON m.id = o.member_id
             LEFT JOIN notification_preferences p ON p.user_id = m.user_id
             WHERE o.id = $1 AND COALESCE(m.email, '') <> ''
             UNION ALL
             SELECT u.id AS user_id, u.email, {flag} AS opted_in
             FROM orders o
             JOIN users u ON u.id = o.ordered_by_id
             LEFT JOIN notification_preferences p ON p.user_id = u.id
             WHERE o.id = $1 AND u.is_active = true AND u.email <> ''"
        );
        sqlx::query_as::<_, RecipientCandidate>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }
}

fn flag_expr(notification_type: &str) -> String {
    match preference_column(notification_type) {
        Some(column) => format!("p.{column}"),
        None => "NULL::BOOLEAN".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Delivery log
// ---------------------------------------------------------------------------

const LOG_COLUMNS: &str = "id, notification_type, recipient_email, subject, body_text, \
    body_html, status, order_id, order_item_id, sent_at, error_message, additional_data, \
    retry_count, created_at, updated_at";

pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Record a delivery attempt in `pending` state.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotificationLog,
    ) -> Result<NotificationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_logs
                (notification_type, recipient_email, subject, body_text, body_html,
                 status, order_id, order_item_id, additional_data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {LOG_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(&input.notification_type)
            .bind(&input.recipient_email)
            .bind(&input.subject)
            .bind(&input.body_text)
            .bind(&input.body_html)
            .bind(LOG_STATUS_PENDING)
            .bind(input.order_id)
            .bind(input.order_item_id)
            .bind(&input.additional_data)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationLog>, sqlx::Error> {
        let query = format!("SELECT {LOG_COLUMNS} FROM notification_logs WHERE id = $1");
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Log entries, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &NotificationLogListParams,
    ) -> Result<Vec<NotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {LOG_COLUMNS} FROM notification_logs
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::TEXT IS NULL OR notification_type = $2)
               AND ($3::BIGINT IS NULL OR order_id = $3)
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(&params.status)
            .bind(&params.notification_type)
            .bind(params.order_id)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_logs
             SET status = $2, sent_at = NOW(), error_message = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(LOG_STATUS_SENT)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notification_logs SET status = $2, error_message = $3 WHERE id = $1")
            .bind(id)
            .bind(LOG_STATUS_FAILED)
            .bind(error)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Move a failed entry back to `pending` and bump its retry counter.
    ///
    /// Returns `None` when the entry does not exist or is not `failed`.
    pub async fn begin_retry(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationLog>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_logs
             SET status = $2, retry_count = retry_count + 1, error_message = NULL
             WHERE id = $1 AND status = $3
             RETURNING {LOG_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(id)
            .bind(LOG_STATUS_PENDING)
            .bind(LOG_STATUS_FAILED)
            .fetch_optional(pool)
            .await
    }

    /// Number of log entries per status.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT status, COUNT(*) FROM notification_logs GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const TEMPLATE_COLUMNS: &str = "id, name, template_type, subject_template, html_template, \
    text_template, is_active, created_at, updated_at";

pub struct EmailTemplateRepo;

impl EmailTemplateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateEmailTemplate,
    ) -> Result<EmailTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO email_templates
                (name, template_type, subject_template, html_template, text_template, is_active)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true))
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, EmailTemplate>(&query)
            .bind(&input.name)
            .bind(&input.template_type)
            .bind(&input.subject_template)
            .bind(&input.html_template)
            .bind(&input.text_template)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmailTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE id = $1");
        sqlx::query_as::<_, EmailTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active template for a notification type, if one is configured.
    pub async fn find_active(
        pool: &PgPool,
        template_type: &str,
    ) -> Result<Option<EmailTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM email_templates
             WHERE template_type = $1 AND is_active = true"
        );
        sqlx::query_as::<_, EmailTemplate>(&query)
            .bind(template_type)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<EmailTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates ORDER BY template_type");
        sqlx::query_as::<_, EmailTemplate>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEmailTemplate,
    ) -> Result<Option<EmailTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE email_templates SET
                name = COALESCE($2, name),
                subject_template = COALESCE($3, subject_template),
                html_template = COALESCE($4, html_template),
                text_template = COALESCE($5, text_template),
                is_active = COALESCE($6, is_active)
             WHERE id = $1
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, EmailTemplate>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.subject_template)
            .bind(&input.html_template)
            .bind(&input.text_template)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
