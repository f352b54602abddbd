//! Email content for each notification type.
//!
//! An active row in `email_templates` overrides the built-in default for its
//! type. Templates use `{{ path }}` placeholders resolved against a JSON
//! context; lists are passed pre-rendered (`items_html`, `items_text`).

use clubhouse_core::templating::{render, strip_tags};
use clubhouse_db::models::notification::{
    EmailTemplate, NOTIFICATION_BULK_UPDATE, NOTIFICATION_DAILY_SUMMARY,
    NOTIFICATION_ORDER_CREATED, NOTIFICATION_ORDER_SUMMARY, NOTIFICATION_PENDING_REMINDER,
    NOTIFICATION_STATUS_UPDATE, NOTIFICATION_WEEKLY_REPORT,
};
use clubhouse_db::repositories::EmailTemplateRepo;
use clubhouse_db::DbPool;
use serde_json::Value;

/// Subject and bodies after placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// A built-in template. An empty `text` means "strip the HTML".
#[derive(Debug, Clone, Copy)]
pub struct DefaultTemplate {
    pub subject: &'static str,
    pub html: &'static str,
    pub text: &'static str,
}

const ORDER_CREATED: DefaultTemplate = DefaultTemplate {
    subject: "Neue Bestellung #{{ order.id }} für {{ order.member_name }}",
    html: "<h2>Neue Bestellung #{{ order.id }}</h2>\n\
<p>Mitglied: {{ order.member_name }}<br>\n\
Bestellt von: {{ order.ordered_by }}<br>\n\
Datum: {{ order.order_date }}</p>\n\
{{ items_html }}\n\
<p>{{ order.notes }}</p>",
    text: "",
};

const STATUS_UPDATE: DefaultTemplate = DefaultTemplate {
    subject: "Status-Update: {{ item.name }} für {{ order.member_name }}",
    html: "<h2>Status-Update zu Bestellung #{{ order.id }}</h2>\n\
<p>Artikel: {{ item.name }} {{ item.size }} ({{ item.quantity }}x)</p>\n\
<p>Status: {{ old_status.name }} &rarr; <strong>{{ new_status.name }}</strong></p>\n\
<p>Geändert von: {{ changed_by }}</p>\n\
<p>{{ notes }}</p>",
    text: "Status-Update zu Bestellung #{{ order.id }}\n\n\
Artikel: {{ item.name }} {{ item.size }} ({{ item.quantity }}x)\n\
Status: {{ old_status.name }} -> {{ new_status.name }}\n\
Geändert von: {{ changed_by }}\n\n\
{{ notes }}",
};

const BULK_UPDATE: DefaultTemplate = DefaultTemplate {
    subject: "Bulk Status-Update für Bestellung #{{ order.id }}",
    html: "<h2>Status-Update zu Bestellung #{{ order.id }}</h2>\n\
<p>Neuer Status: <strong>{{ new_status.name }}</strong></p>\n\
{{ items_html }}\n\
<p>Geändert von: {{ changed_by }}</p>",
    text: "",
};

const PENDING_REMINDER: DefaultTemplate = DefaultTemplate {
    subject: "Erinnerung: Offene Bestellartikel in Bestellung #{{ order.id }}",
    html: "<h2>Offene Artikel in Bestellung #{{ order.id }}</h2>\n\
<p>Mitglied: {{ order.member_name }}<br>\n\
Bestellt am: {{ order.order_date }}</p>\n\
{{ items_html }}",
    text: "",
};

const ORDER_SUMMARY: DefaultTemplate = DefaultTemplate {
    subject: "Bestellübersicht {{ app.title }} - {{ total_items }} Artikel",
    html: "<h2>Bestellübersicht</h2>\n\
<p>Status: {{ statuses }}</p>\n\
{{ shopping_list_html }}\n\
<p>Gesamt: {{ total_items }} Artikel</p>",
    text: "",
};

const PERIODIC_SUMMARY: DefaultTemplate = DefaultTemplate {
    subject: "{{ app.title }}: Bestellungen",
    html: "<h2>Bestellungen</h2>\n{{ items_html }}",
    text: "",
};

/// The built-in template for `notification_type`.
pub fn default_template(notification_type: &str) -> Option<DefaultTemplate> {
    match notification_type {
        NOTIFICATION_ORDER_CREATED => Some(ORDER_CREATED),
        NOTIFICATION_STATUS_UPDATE => Some(STATUS_UPDATE),
        NOTIFICATION_BULK_UPDATE => Some(BULK_UPDATE),
        NOTIFICATION_PENDING_REMINDER => Some(PENDING_REMINDER),
        NOTIFICATION_ORDER_SUMMARY => Some(ORDER_SUMMARY),
        NOTIFICATION_DAILY_SUMMARY | NOTIFICATION_WEEKLY_REPORT => Some(PERIODIC_SUMMARY),
        _ => None,
    }
}

fn render_parts(subject: &str, html: &str, text: &str, context: &Value) -> RenderedEmail {
    let html = render(html, context);
    let text = if text.trim().is_empty() {
        strip_tags(&html)
    } else {
        render(text, context)
    };
    RenderedEmail {
        subject: render(subject, context).trim().to_string(),
        html,
        text,
    }
}

/// Render a stored template.
pub fn render_stored(template: &EmailTemplate, context: &Value) -> RenderedEmail {
    render_parts(
        &template.subject_template,
        &template.html_template,
        &template.text_template,
        context,
    )
}

/// Render the built-in template; `None` for types without one.
pub fn render_default(notification_type: &str, context: &Value) -> Option<RenderedEmail> {
    default_template(notification_type).map(|t| render_parts(t.subject, t.html, t.text, context))
}

/// Render `notification_type`, preferring an active stored template.
pub async fn render_for(
    pool: &DbPool,
    notification_type: &str,
    context: &Value,
) -> Result<Option<RenderedEmail>, sqlx::Error> {
    if let Some(stored) = EmailTemplateRepo::find_active(pool, notification_type).await? {
        return Ok(Some(render_stored(&stored, context)));
    }
    Ok(render_default(notification_type, context))
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<ul>` of the given lines, escaped.
pub fn html_list<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let items: String = lines
        .into_iter()
        .map(|line| format!("<li>{}</li>", escape_html(line)))
        .collect();
    format!("<ul>{items}</ul>")
}

/// `- ` prefixed lines.
pub fn text_list<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines
        .into_iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_db::models::notification::NOTIFICATION_TYPES;
    use serde_json::json;

    #[test]
    fn every_type_has_a_default() {
        for t in NOTIFICATION_TYPES {
            assert!(default_template(t).is_some(), "{t}");
        }
    }

    #[test]
    fn default_text_is_stripped_html() {
        let ctx = json!({
            "order": {"id": 12, "member_name": "Lena Berger", "ordered_by": "admin",
                      "order_date": "01.06.2025", "notes": ""},
            "items_html": html_list(["Jacke M (1x)"]),
        });
        let email = render_default(NOTIFICATION_ORDER_CREATED, &ctx).unwrap();
        assert_eq!(email.subject, "Neue Bestellung #12 für Lena Berger");
        assert!(email.html.contains("<li>Jacke M (1x)</li>"));
        assert!(email.text.contains("Jacke M (1x)"));
        assert!(!email.text.contains('<'));
    }

    #[test]
    fn explicit_text_template_is_used() {
        let ctx = json!({
            "order": {"id": 3, "member_name": "Jonas"},
            "item": {"name": "Helm", "size": "", "quantity": 1},
            "old_status": {"name": "Ausstehend"},
            "new_status": {"name": "Bestellt"},
            "changed_by": "kasse",
        });
        let email = render_default(NOTIFICATION_STATUS_UPDATE, &ctx).unwrap();
        assert!(email.text.contains("Ausstehend -> Bestellt"));
    }

    #[test]
    fn stored_template_without_text_strips_html() {
        let template = EmailTemplate {
            id: 1,
            name: "custom".into(),
            template_type: NOTIFICATION_ORDER_CREATED.into(),
            subject_template: "  Order {{ order.id }} {{ missing }} ".into(),
            html_template: "<p>Hi {{ order.member_name }}</p>".into(),
            text_template: String::new(),
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let email = render_stored(&template, &json!({"order": {"id": 5, "member_name": "A"}}));
        assert_eq!(email.subject, "Order 5");
        assert_eq!(email.text, "Hi A");
    }

    #[test]
    fn list_helpers_escape() {
        assert_eq!(html_list(["a<b"]), "<ul><li>a&lt;b</li></ul>");
        assert_eq!(text_list(["x", "y"]), "- x\n- y");
    }
}
