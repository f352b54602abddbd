//! Order notifications: recipient resolution, rendering, delivery logging and
//! manual retry.
//!
//! Every attempt is logged as `pending` before the mailer is called and then
//! marked `sent` or `failed`. The order-flow entry points never fail; problems
//! are logged and reflected in the returned [`DispatchReport`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use clubhouse_core::orders::{STATUS_ORDERED, STATUS_PENDING};
use clubhouse_core::preferences::{GENERAL_TITLE, ORDERS_EQUIPMENT_MANAGER_EMAIL};
use clubhouse_core::types::DbId;
use clubhouse_db::models::notification::{
    CreateNotificationLog, NotificationLog, RecipientCandidate,
    NOTIFICATION_BULK_UPDATE, NOTIFICATION_ORDER_CREATED, NOTIFICATION_ORDER_SUMMARY,
    NOTIFICATION_PENDING_REMINDER, NOTIFICATION_STATUS_UPDATE,
};
use clubhouse_db::models::order::{Order, OrderItem, OrderStatus, ShoppingListRow, StatusChange};
use clubhouse_db::repositories::{
    NotificationLogRepo, NotificationPreferenceRepo, OrderItemRepo, OrderRepo, PreferenceRepo,
};
use clubhouse_db::DbPool;
use serde::Serialize;
use serde_json::{json, Value};

use crate::delivery::email::{Mailer, OutgoingEmail};
use crate::templates::{html_list, render_for, text_list, RenderedEmail};

/// Default age in days before open order items trigger a reminder.
pub const DEFAULT_REMINDER_DAYS: i64 = 7;

/// Statuses that count as "still open" for reminders.
pub const REMINDER_STATUSES: &[&str] = &[STATUS_PENDING, STATUS_ORDERED];

// ---------------------------------------------------------------------------
// Error / reports
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification log {0} not found")]
    LogNotFound(DbId),

    #[error("Only failed notifications can be retried (status is '{0}')")]
    NotRetryable(String),

    #[error("No recipient email address configured")]
    NoRecipient,

    #[error("No template available for notification type '{0}'")]
    NoTemplate(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn absorb(&mut self, other: DispatchReport) {
        self.recipients += other.recipients;
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Outcome of a reminder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub orders: usize,
    #[serde(flatten)]
    pub delivery: DispatchReport,
}

/// Keep opted-in candidates (a missing preference row counts as opted in),
/// drop blanks and duplicates, preserve order.
pub fn select_recipients(candidates: Vec<RecipientCandidate>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| c.opted_in != Some(false))
        .map(|c| c.email.trim().to_string())
        .filter(|email| !email.is_empty() && seen.insert(email.to_lowercase()))
        .collect()
}

// ---------------------------------------------------------------------------
// Context helpers
// ---------------------------------------------------------------------------

fn order_context(order: &Order) -> Value {
    json!({
        "id": order.id,
        "member_name": order.member_name,
        "member_email": order.member_email,
        "ordered_by": order.ordered_by_name.clone().unwrap_or_default(),
        "order_date": order.order_date.format("%d.%m.%Y").to_string(),
        "notes": order.notes.clone().unwrap_or_default(),
    })
}

fn item_line(item: &OrderItem) -> String {
    let size = item.size.as_deref().map(|s| format!(" {s}")).unwrap_or_default();
    format!("{}{size} ({}x) - {}", item.item_name, item.quantity, item.status_name)
}

fn items_context(items: &[OrderItem]) -> (String, String) {
    let lines: Vec<String> = items.iter().map(item_line).collect();
    (
        html_list(lines.iter().map(String::as_str)),
        text_list(lines.iter().map(String::as_str)),
    )
}

fn shopping_line(row: &ShoppingListRow) -> String {
    let size = row.size.as_deref().map(|s| format!(" {s}")).unwrap_or_default();
    let category = if row.category.is_empty() {
        String::new()
    } else {
        format!(" [{}]", row.category)
    };
    format!("{}x {}{size}{category}", row.quantity, row.item_name)
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Dispatches order notifications through a [`Mailer`].
#[derive(Clone)]
pub struct NotificationService {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Notify staff about a new order.
    pub async fn order_created(&self, order_id: DbId) -> DispatchReport {
        settle(NOTIFICATION_ORDER_CREATED, self.try_order_created(order_id).await)
    }

    /// Notify the member and the ordering user about one item's status change.
    pub async fn status_update(
        &self,
        change: &StatusChange,
        changed_by: Option<&str>,
        notes: Option<&str>,
    ) -> DispatchReport {
        settle(
            NOTIFICATION_STATUS_UPDATE,
            self.try_status_update(change, changed_by, notes).await,
        )
    }

    /// One notification per affected order after a bulk status change.
    pub async fn bulk_update(
        &self,
        items: &[OrderItem],
        new_status: &OrderStatus,
        changed_by: Option<&str>,
    ) -> DispatchReport {
        let mut by_order: BTreeMap<DbId, Vec<OrderItem>> = BTreeMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item.clone());
        }

        let mut report = DispatchReport::default();
        for (order_id, order_items) in by_order {
            let result = self
                .try_bulk_update(order_id, &order_items, new_status, changed_by)
                .await;
            report.absorb(settle(NOTIFICATION_BULK_UPDATE, result));
        }
        report
    }

    /// Remind staff of orders older than `older_than_days` that still have
    /// pending or ordered items.
    pub async fn pending_reminders(
        &self,
        older_than_days: i64,
    ) -> Result<ReminderReport, NotificationError> {
        let orders =
            OrderRepo::list_with_items_in_status(&self.pool, REMINDER_STATUSES, older_than_days)
                .await?;
        let recipients = select_recipients(
            NotificationPreferenceRepo::staff_candidates(&self.pool, NOTIFICATION_PENDING_REMINDER)
                .await?,
        );
        let app = self.app_context().await?;

        let mut report = ReminderReport::default();
        for entry in orders.iter().filter(|o| !o.items.is_empty()) {
            report.orders += 1;
            let (items_html, items_text) = items_context(&entry.items);
            let context = json!({
                "app": app,
                "order": order_context(&entry.order),
                "items_html": items_html,
                "items_text": items_text,
                "item_count": entry.items.len(),
            });
            let email = self.render(NOTIFICATION_PENDING_REMINDER, &context).await?;
            let data = json!({ "item_ids": entry.items.iter().map(|i| i.id).collect::<Vec<_>>() });
            report.delivery.absorb(
                self.deliver(
                    NOTIFICATION_PENDING_REMINDER,
                    &recipients,
                    &email,
                    Some(entry.order.id),
                    None,
                    data,
                )
                .await?,
            );
        }

        tracing::info!(
            orders = report.orders,
            sent = report.delivery.sent,
            failed = report.delivery.failed,
            "Pending order reminders processed"
        );
        Ok(report)
    }

    /// Send the shopping list for items in `statuses` to `recipient`, or to
    /// the configured equipment manager.
    pub async fn order_summary(
        &self,
        recipient: Option<&str>,
        statuses: &[String],
    ) -> Result<DispatchReport, NotificationError> {
        let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => PreferenceRepo::get_string(&self.pool, ORDERS_EQUIPMENT_MANAGER_EMAIL).await?,
        };
        if recipient.trim().is_empty() {
            return Err(NotificationError::NoRecipient);
        }

        let statuses: Vec<String> = if statuses.is_empty() {
            vec![STATUS_PENDING.to_string()]
        } else {
            statuses.to_vec()
        };
        let rows = OrderItemRepo::shopping_list(&self.pool, &statuses).await?;
        let lines: Vec<String> = rows.iter().map(shopping_line).collect();
        let total_items: i64 = rows.iter().map(|r| r.quantity).sum();

        let context = json!({
            "app": self.app_context().await?,
            "statuses": statuses.join(", "),
            "shopping_list_html": html_list(lines.iter().map(String::as_str)),
            "shopping_list_text": text_list(lines.iter().map(String::as_str)),
            "total_items": total_items,
            "line_count": rows.len(),
        });
        let email = self.render(NOTIFICATION_ORDER_SUMMARY, &context).await?;
        let data = json!({ "statuses": statuses, "total_items": total_items });
        Ok(self
            .deliver(
                NOTIFICATION_ORDER_SUMMARY,
                &[recipient.trim().to_string()],
                &email,
                None,
                None,
                data,
            )
            .await?)
    }

    /// Re-send a failed log entry with its stored content.
    pub async fn retry(&self, log_id: DbId) -> Result<NotificationLog, NotificationError> {
        let Some(log) = NotificationLogRepo::begin_retry(&self.pool, log_id).await? else {
            return match NotificationLogRepo::find_by_id(&self.pool, log_id).await? {
                Some(existing) => Err(NotificationError::NotRetryable(existing.status)),
                None => Err(NotificationError::LogNotFound(log_id)),
            };
        };

        let email = OutgoingEmail {
            to: log.recipient_email.clone(),
            subject: log.subject.clone(),
            text_body: log.body_text.clone(),
            html_body: log.body_html.clone(),
        };
        self.send_logged(log.id, &email).await?;
        tracing::info!(log_id, retry_count = log.retry_count, "Notification retried");

        NotificationLogRepo::find_by_id(&self.pool, log_id)
            .await?
            .ok_or(NotificationError::LogNotFound(log_id))
    }

    // -- internals ----------------------------------------------------------

    async fn try_order_created(&self, order_id: DbId) -> Result<DispatchReport, NotificationError> {
        let Some(entry) = OrderRepo::find_with_items(&self.pool, order_id).await? else {
            return Ok(DispatchReport::default());
        };
        let recipients = select_recipients(
            NotificationPreferenceRepo::staff_candidates(&self.pool, NOTIFICATION_ORDER_CREATED)
                .await?,
        );
        if recipients.is_empty() {
            tracing::warn!(order_id, "No staff recipients for order notification");
            return Ok(DispatchReport::default());
        }

        let (items_html, items_text) = items_context(&entry.items);
        let context = json!({
            "app": self.app_context().await?,
            "order": order_context(&entry.order),
            "items_html": items_html,
            "items_text": items_text,
            "item_count": entry.items.len(),
        });
        let email = self.render(NOTIFICATION_ORDER_CREATED, &context).await?;
        Ok(self
            .deliver(
                NOTIFICATION_ORDER_CREATED,
                &recipients,
                &email,
                Some(order_id),
                None,
                json!({}),
            )
            .await?)
    }

    async fn try_status_update(
        &self,
        change: &StatusChange,
        changed_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<DispatchReport, NotificationError> {
        let item = &change.item;
        let Some(order) = OrderRepo::find_by_id(&self.pool, item.order_id).await? else {
            return Ok(DispatchReport::default());
        };
        let recipients = select_recipients(
            NotificationPreferenceRepo::order_candidates(
                &self.pool,
                order.id,
                NOTIFICATION_STATUS_UPDATE,
            )
            .await?,
        );
        if recipients.is_empty() {
            return Ok(DispatchReport::default());
        }

        let context = json!({
            "app": self.app_context().await?,
            "order": order_context(&order),
            "item": {
                "id": item.id,
                "name": item.item_name,
                "size": item.size.clone().unwrap_or_default(),
                "quantity": item.quantity,
            },
            "old_status": { "code": change.from_code, "name": change.from_name },
            "new_status": { "code": item.status_code, "name": item.status_name },
            "changed_by": changed_by.unwrap_or_default(),
            "notes": notes.unwrap_or_default(),
        });
        let email = self.render(NOTIFICATION_STATUS_UPDATE, &context).await?;
        let data = json!({ "from_status": change.from_code, "to_status": item.status_code });
        Ok(self
            .deliver(
                NOTIFICATION_STATUS_UPDATE,
                &recipients,
                &email,
                Some(order.id),
                Some(item.id),
                data,
            )
            .await?)
    }

    async fn try_bulk_update(
        &self,
        order_id: DbId,
        items: &[OrderItem],
        new_status: &OrderStatus,
        changed_by: Option<&str>,
    ) -> Result<DispatchReport, NotificationError> {
        let Some(order) = OrderRepo::find_by_id(&self.pool, order_id).await? else {
            return Ok(DispatchReport::default());
        };
        let recipients = select_recipients(
            NotificationPreferenceRepo::order_candidates(
                &self.pool,
                order_id,
                NOTIFICATION_BULK_UPDATE,
            )
            .await?,
        );
        if recipients.is_empty() {
            return Ok(DispatchReport::default());
        }

        let (items_html, items_text) = items_context(items);
        let context = json!({
            "app": self.app_context().await?,
            "order": order_context(&order),
            "new_status": { "code": new_status.code, "name": new_status.name },
            "changed_by": changed_by.unwrap_or_default(),
            "items_html": items_html,
            "items_text": items_text,
            "item_count": items.len(),
        });
        let email = self.render(NOTIFICATION_BULK_UPDATE, &context).await?;
        let data = json!({
            "to_status": new_status.code,
            "item_ids": items.iter().map(|i| i.id).collect::<Vec<_>>(),
        });
        Ok(self
            .deliver(NOTIFICATION_BULK_UPDATE, &recipients, &email, Some(order_id), None, data)
            .await?)
    }

    async fn app_context(&self) -> Result<Value, sqlx::Error> {
        let title = PreferenceRepo::get_string(&self.pool, GENERAL_TITLE).await?;
        Ok(json!({ "title": title, "now": Utc::now().format("%d.%m.%Y %H:%M").to_string() }))
    }

    async fn render(
        &self,
        notification_type: &str,
        context: &Value,
    ) -> Result<RenderedEmail, NotificationError> {
        render_for(&self.pool, notification_type, context)
            .await?
            .ok_or_else(|| NotificationError::NoTemplate(notification_type.to_string()))
    }

    /// Log and send `email` to each recipient.
    async fn deliver(
        &self,
        notification_type: &str,
        recipients: &[String],
        email: &RenderedEmail,
        order_id: Option<DbId>,
        order_item_id: Option<DbId>,
        additional_data: Value,
    ) -> Result<DispatchReport, sqlx::Error> {
        let mut report = DispatchReport::default();
        for recipient in recipients {
            report.recipients += 1;
            let log = NotificationLogRepo::create(
                &self.pool,
                &CreateNotificationLog {
                    notification_type: notification_type.to_string(),
                    recipient_email: recipient.clone(),
                    subject: email.subject.clone(),
                    body_text: email.text.clone(),
                    body_html: Some(email.html.clone()),
                    order_id,
                    order_item_id,
                    additional_data: additional_data.clone(),
                },
            )
            .await?;
            let outgoing = OutgoingEmail {
                to: recipient.clone(),
                subject: email.subject.clone(),
                text_body: email.text.clone(),
                html_body: Some(email.html.clone()),
            };
            if self.send_logged(log.id, &outgoing).await? {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }
        Ok(report)
    }

    /// Send and record the outcome on log `log_id`. Returns whether the send
    /// succeeded.
    async fn send_logged(&self, log_id: DbId, email: &OutgoingEmail) -> Result<bool, sqlx::Error> {
        match self.mailer.send(email).await {
            Ok(()) => {
                NotificationLogRepo::mark_sent(&self.pool, log_id).await?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(log_id, to = %email.to, error = %e, "Notification email failed");
                NotificationLogRepo::mark_failed(&self.pool, log_id, &e.to_string()).await?;
                Ok(false)
            }
        }
    }
}

/// Collapse an order-flow dispatch result; errors are logged, never raised.
fn settle(notification_type: &str, result: Result<DispatchReport, NotificationError>) -> DispatchReport {
    match result {
        Ok(report) => {
            tracing::debug!(
                notification_type,
                sent = report.sent,
                failed = report.failed,
                "Notification dispatched"
            );
            report
        }
        Err(e) => {
            tracing::error!(notification_type, error = %e, "Notification dispatch failed");
            DispatchReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(email: &str, opted_in: Option<bool>) -> RecipientCandidate {
        RecipientCandidate {
            user_id: None,
            email: email.to_string(),
            opted_in,
        }
    }

    #[test]
    fn recipients_skip_opt_outs_and_duplicates() {
        let selected = select_recipients(vec![
            candidate("a@example.org", Some(true)),
            candidate("b@example.org", None),
            candidate("c@example.org", Some(false)),
            candidate("A@example.org ", None),
            candidate("  ", None),
        ]);
        assert_eq!(selected, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    fn report_absorb_adds() {
        let mut total = DispatchReport::default();
        total.absorb(DispatchReport { recipients: 2, sent: 1, failed: 1 });
        total.absorb(DispatchReport { recipients: 1, sent: 1, failed: 0 });
        assert_eq!(total, DispatchReport { recipients: 3, sent: 2, failed: 1 });
    }

    #[test]
    fn shopping_line_formats() {
        let row = ShoppingListRow {
            item_id: 1,
            item_name: "Jacke".into(),
            category: "Bekleidung".into(),
            size: Some("L".into()),
            quantity: 4,
        };
        assert_eq!(shopping_line(&row), "4x Jacke L [Bekleidung]");
    }
}
