//! Derived member and parent fields.

use chrono::Datelike;

use crate::types::Date;

/// Age in whole years on `today`; 0 when the birthday is unknown.
pub fn age_on(birthday: Option<Date>, today: Date) -> i32 {
    let Some(birthday) = birthday else {
        return 0;
    };
    let mut age = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }
    age.max(0)
}

pub fn full_name(name: &str, lastname: &str) -> String {
    format!("{name} {lastname}").trim().to_string()
}

/// Mobile number in the form used for `wa.me` links: no spaces, no `+`.
pub fn whatsapp_number(mobile: Option<&str>) -> Option<String> {
    let number: String = mobile?
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .collect();
    (!number.is_empty()).then_some(number)
}
