//! Runtime-configurable settings registry.
//!
//! Every preference is declared here with its section, type and default.
//! Stored overrides live in the `preferences` table as JSON values; reads
//! fall back to the default when no override exists.

use chrono::NaiveTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

pub const SECTION_GENERAL: &str = "general";
pub const SECTION_EMAIL: &str = "email";
pub const SECTION_MEMBERS: &str = "members";
pub const SECTION_SERVICE: &str = "service";
pub const SECTION_ORDERS: &str = "orders";

pub const SECTIONS: &[&str] = &[
    SECTION_GENERAL,
    SECTION_EMAIL,
    SECTION_MEMBERS,
    SECTION_SERVICE,
    SECTION_ORDERS,
];

/// A `(section, name)` pair identifying one preference.
pub type PreferenceKey = (&'static str, &'static str);

pub const GENERAL_TITLE: PreferenceKey = (SECTION_GENERAL, "title");
pub const MEMBERS_ALERT_THRESHOLD: PreferenceKey = (SECTION_MEMBERS, "alert_threshold");
pub const MEMBERS_ALERT_LAST_ENTRIES: PreferenceKey =
    (SECTION_MEMBERS, "alert_threshold_last_entries");
pub const SERVICE_START_TIME: PreferenceKey = (SECTION_SERVICE, "service_start_time");
pub const SERVICE_END_TIME: PreferenceKey = (SECTION_SERVICE, "service_end_time");
pub const ORDERS_EQUIPMENT_MANAGER_EMAIL: PreferenceKey =
    (SECTION_ORDERS, "equipment_manager_email");
pub const EMAIL_HOST: PreferenceKey = (SECTION_EMAIL, "email_host");
pub const EMAIL_PORT: PreferenceKey = (SECTION_EMAIL, "email_port");
pub const EMAIL_USE_TLS: PreferenceKey = (SECTION_EMAIL, "email_use_tls");
pub const EMAIL_USE_SSL: PreferenceKey = (SECTION_EMAIL, "email_use_ssl");
pub const EMAIL_HOST_USER: PreferenceKey = (SECTION_EMAIL, "email_host_user");
pub const EMAIL_HOST_PASSWORD: PreferenceKey = (SECTION_EMAIL, "email_host_password");
pub const EMAIL_DEFAULT_FROM: PreferenceKey = (SECTION_EMAIL, "default_from_email");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    String,
    Integer,
    Boolean,
    Email,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::Str(s) => Value::String(s.to_string()),
            DefaultValue::Int(n) => Value::from(n),
            DefaultValue::Bool(b) => Value::Bool(b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreferenceDef {
    pub section: &'static str,
    pub name: &'static str,
    pub kind: PreferenceKind,
    pub default: DefaultValue,
    pub label: &'static str,
    /// Secret values are write-only through the API.
    pub secret: bool,
    /// Lower bound for integers.
    pub min: Option<i64>,
}

impl PreferenceDef {
    pub fn key(&self) -> PreferenceKey {
        (self.section, self.name)
    }

    /// Flat identifier such as `members__alert_threshold`.
    pub fn identifier(&self) -> String {
        format!("{}__{}", self.section, self.name)
    }
}

const fn def(
    key: PreferenceKey,
    kind: PreferenceKind,
    default: DefaultValue,
    label: &'static str,
) -> PreferenceDef {
    PreferenceDef {
        section: key.0,
        name: key.1,
        kind,
        default,
        label,
        secret: false,
        min: None,
    }
}

pub const REGISTRY: &[PreferenceDef] = &[
    def(GENERAL_TITLE, PreferenceKind::String, DefaultValue::Str("JF Manager"), "Application title"),
    PreferenceDef {
        min: Some(1),
        ..def(
            MEMBERS_ALERT_THRESHOLD,
            PreferenceKind::Integer,
            DefaultValue::Int(3),
            "Absences (excused or missing) that raise an attendance alert",
        )
    },
    PreferenceDef {
        min: Some(1),
        ..def(
            MEMBERS_ALERT_LAST_ENTRIES,
            PreferenceKind::Integer,
            DefaultValue::Int(10),
            "Number of most recent services inspected for the attendance alert",
        )
    },
    def(SERVICE_START_TIME, PreferenceKind::Time, DefaultValue::Str("18:00"), "Default service start time"),
    def(SERVICE_END_TIME, PreferenceKind::Time, DefaultValue::Str("19:30"), "Default service end time"),
    def(
        ORDERS_EQUIPMENT_MANAGER_EMAIL,
        PreferenceKind::Email,
        DefaultValue::Str(""),
        "Equipment manager email address",
    ),
    def(EMAIL_HOST, PreferenceKind::String, DefaultValue::Str(""), "SMTP host"),
    PreferenceDef {
        min: Some(1),
        ..def(EMAIL_PORT, PreferenceKind::Integer, DefaultValue::Int(587), "SMTP port")
    },
    def(EMAIL_USE_TLS, PreferenceKind::Boolean, DefaultValue::Bool(true), "Use STARTTLS"),
    def(EMAIL_USE_SSL, PreferenceKind::Boolean, DefaultValue::Bool(false), "Use implicit TLS"),
    def(EMAIL_HOST_USER, PreferenceKind::String, DefaultValue::Str(""), "SMTP user"),
    PreferenceDef {
        secret: true,
        ..def(EMAIL_HOST_PASSWORD, PreferenceKind::String, DefaultValue::Str(""), "SMTP password")
    },
    def(EMAIL_DEFAULT_FROM, PreferenceKind::Email, DefaultValue::Str(""), "Sender address"),
];

pub fn find(section: &str, name: &str) -> Option<&'static PreferenceDef> {
    REGISTRY.iter().find(|d| d.section == section && d.name == name)
}

pub fn lookup(key: PreferenceKey) -> &'static PreferenceDef {
    // Keys are only built from the constants above.
    find(key.0, key.1).unwrap_or(&REGISTRY[0])
}

pub fn in_section(section: &str) -> impl Iterator<Item = &'static PreferenceDef> + '_ {
    REGISTRY.iter().filter(move |d| d.section == section)
}

pub fn is_section(section: &str) -> bool {
    SECTIONS.contains(&section)
}

/// Validate and normalize an incoming value for `def`.
///
/// Integers and booleans are also accepted in string form.
pub fn validate_value(def: &PreferenceDef, value: &Value) -> Result<Value, CoreError> {
    let invalid = |expected: &str| {
        CoreError::Validation(format!(
            "Invalid value for '{}': expected {expected}",
            def.identifier()
        ))
    };
    match def.kind {
        PreferenceKind::String => value
            .as_str()
            .map(|s| Value::String(s.trim().to_string()))
            .ok_or_else(|| invalid("a string")),
        PreferenceKind::Integer => {
            let n = value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| invalid("an integer"))?;
            if let Some(min) = def.min {
                if n < min {
                    return Err(invalid(&format!("an integer >= {min}")));
                }
            }
            Ok(Value::from(n))
        }
        PreferenceKind::Boolean => value
            .as_bool()
            .or_else(|| match value.as_str() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            })
            .map(Value::Bool)
            .ok_or_else(|| invalid("a boolean")),
        PreferenceKind::Email => {
            let s = value.as_str().ok_or_else(|| invalid("an email address"))?.trim();
            if s.is_empty() || looks_like_email(s) {
                Ok(Value::String(s.to_string()))
            } else {
                Err(invalid("an email address"))
            }
        }
        PreferenceKind::Time => {
            let s = value.as_str().ok_or_else(|| invalid("a time (HH:MM)"))?.trim();
            NaiveTime::parse_from_str(s, "%H:%M")
                .map(|t| Value::String(t.format("%H:%M").to_string()))
                .map_err(|_| invalid("a time (HH:MM)"))
        }
    }
}

/// Loose `local@domain.tld` check.
pub fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Parse a stored `HH:MM` time, falling back to the registry default.
pub fn parse_time(value: &Value, key: PreferenceKey) -> NaiveTime {
    let parse = |s: &str| NaiveTime::parse_from_str(s, "%H:%M").ok();
    value
        .as_str()
        .and_then(parse)
        .or_else(|| match lookup(key).default {
            DefaultValue::Str(s) => parse(s),
            _ => None,
        })
        .unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_keys_are_unique_and_sections_known() {
        for (i, a) in REGISTRY.iter().enumerate() {
            assert!(is_section(a.section), "{}", a.identifier());
            for b in &REGISTRY[i + 1..] {
                assert_ne!(a.key(), b.key());
            }
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(lookup(GENERAL_TITLE).default.to_json(), json!("JF Manager"));
        assert_eq!(lookup(MEMBERS_ALERT_THRESHOLD).default.to_json(), json!(3));
        assert_eq!(lookup(MEMBERS_ALERT_LAST_ENTRIES).default.to_json(), json!(10));
        assert_eq!(lookup(SERVICE_START_TIME).default.to_json(), json!("18:00"));
        assert_eq!(lookup(SERVICE_END_TIME).default.to_json(), json!("19:30"));
        assert!(lookup(EMAIL_HOST_PASSWORD).secret);
    }

    #[test]
    fn identifier_uses_double_underscore() {
        assert_eq!(lookup(MEMBERS_ALERT_THRESHOLD).identifier(), "members__alert_threshold");
    }

    #[test]
    fn integer_validation() {
        let d = lookup(MEMBERS_ALERT_THRESHOLD);
        assert_eq!(validate_value(d, &json!(5)).unwrap(), json!(5));
        assert_eq!(validate_value(d, &json!("7")).unwrap(), json!(7));
        assert!(validate_value(d, &json!(0)).is_err());
        assert!(validate_value(d, &json!("many")).is_err());
    }

    #[test]
    fn time_validation_normalizes() {
        let d = lookup(SERVICE_START_TIME);
        assert_eq!(validate_value(d, &json!("8:05")).unwrap(), json!("08:05"));
        assert!(validate_value(d, &json!("25:00")).is_err());
    }

    #[test]
    fn email_validation_allows_blank() {
        let d = lookup(ORDERS_EQUIPMENT_MANAGER_EMAIL);
        assert!(validate_value(d, &json!("")).is_ok());
        assert!(validate_value(d, &json!("kleiderkammer@example.org")).is_ok());
        assert!(validate_value(d, &json!("not-an-email")).is_err());
    }

    #[test]
    fn boolean_validation() {
        let d = lookup(EMAIL_USE_SSL);
        assert_eq!(validate_value(d, &json!("true")).unwrap(), json!(true));
        assert!(validate_value(d, &json!(1)).is_err());
    }

    #[test]
    fn parse_time_falls_back_to_default() {
        let t = parse_time(&json!("garbage"), SERVICE_END_TIME);
        assert_eq!(t.format("%H:%M").to_string(), "19:30");
    }
}
