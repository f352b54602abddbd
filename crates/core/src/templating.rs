//! Minimal `{{ path }}` template rendering for notification emails.
//!
//! Placeholders resolve dotted paths against a JSON context; unknown paths
//! render as an empty string. Numbers and booleans render via their JSON
//! representation, strings verbatim.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n([ \t]*\n)+").expect("valid regex"));

/// Render `template` against `context`.
pub fn render(template: &str, context: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            lookup(context, &caps[1]).map(display).unwrap_or_default()
        })
        .into_owned()
}

/// Resolve a dotted path (`order.member.name`, `items.0.name`).
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Plain-text version of an HTML body: tags removed, common entities decoded,
/// runs of blank lines collapsed.
pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Placeholders of `template` that resolve to nothing in `context`.
pub fn unresolved_placeholders(template: &str, context: &Value) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|path| lookup(context, path).is_none())
        .collect()
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_paths() {
        let ctx = json!({"order": {"id": 12, "member": {"name": "Lena"}}, "count": 3});
        assert_eq!(
            render("Bestellung #{{ order.id }} für {{order.member.name}} ({{ count }})", &ctx),
            "Bestellung #12 für Lena (3)"
        );
    }

    #[test]
    fn unknown_and_null_render_empty() {
        let ctx = json!({"a": null});
        assert_eq!(render("[{{ a }}][{{ missing.path }}]", &ctx), "[][]");
    }

    #[test]
    fn array_indexing() {
        let ctx = json!({"items": [{"name": "Helm"}]});
        assert_eq!(render("{{ items.0.name }}", &ctx), "Helm");
    }

    #[test]
    fn strip_tags_produces_plain_text() {
        let html = "<h1>Hallo</h1>\n<p>Ihre <b>Bestellung</b> &amp; mehr</p>\n\n\n\n<p>Ende</p>";
        assert_eq!(strip_tags(html), "Hallo\nIhre Bestellung & mehr\n\nEnde");
    }

    #[test]
    fn reports_unresolved_placeholders() {
        let ctx = json!({"known": 1});
        assert_eq!(
            unresolved_placeholders("{{ known }} {{ unknown }}", &ctx),
            vec!["unknown".to_string()]
        );
    }
}
