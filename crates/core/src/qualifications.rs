//! Qualification expiry and special-task activity rules.

use chrono::Months;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Date;

/// Window used for "expires soon" classification.
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 30;

/// Expiring types need a validity period; non-expiring types must not have one.
pub fn validate_type(expires: bool, validity_period_months: Option<i32>) -> Result<(), CoreError> {
    match (expires, validity_period_months) {
        (true, None) => Err(CoreError::Validation(
            "An expiring qualification type requires a validity period".into(),
        )),
        (true, Some(months)) if months <= 0 => Err(CoreError::Validation(
            "Validity period must be at least one month".into(),
        )),
        (false, Some(_)) => Err(CoreError::Validation(
            "A non-expiring qualification type cannot have a validity period".into(),
        )),
        _ => Ok(()),
    }
}

/// `acquired + months`, clamped to the end of the target month.
pub fn compute_expiry(acquired: Date, validity_period_months: i32) -> Option<Date> {
    let months = u32::try_from(validity_period_months).ok()?;
    acquired.checked_add_months(Months::new(months))
}

/// Resolve the stored expiry date for a qualification.
///
/// An explicit date wins; otherwise expiring types derive it from the
/// acquisition date.
pub fn resolve_expiry(
    acquired: Date,
    explicit: Option<Date>,
    type_expires: bool,
    validity_period_months: Option<i32>,
) -> Result<Option<Date>, CoreError> {
    if let Some(date) = explicit {
        if date < acquired {
            return Err(CoreError::Validation(
                "Expiry date cannot be before the acquisition date".into(),
            ));
        }
        return Ok(Some(date));
    }
    match (type_expires, validity_period_months) {
        (true, Some(months)) => Ok(compute_expiry(acquired, months)),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    NoExpiry,
    Valid,
    ExpiresSoon,
    Expired,
}

pub fn is_expired(expires: Option<Date>, today: Date) -> bool {
    expires.is_some_and(|d| d < today)
}

/// Not yet expired but expiring within `days`.
pub fn expires_soon(expires: Option<Date>, today: Date, days: i64) -> bool {
    match expires {
        Some(d) => d >= today && d <= today + chrono::Duration::days(days),
        None => false,
    }
}

pub fn expiry_status(expires: Option<Date>, today: Date, days: i64) -> ExpiryStatus {
    if expires.is_none() {
        ExpiryStatus::NoExpiry
    } else if is_expired(expires, today) {
        ExpiryStatus::Expired
    } else if expires_soon(expires, today, days) {
        ExpiryStatus::ExpiresSoon
    } else {
        ExpiryStatus::Valid
    }
}

/// End date, when present, must not precede the start date.
pub fn validate_task_dates(start: Date, end: Option<Date>) -> Result<(), CoreError> {
    match end {
        Some(end) if end < start => Err(CoreError::Validation(
            "End date cannot be before start date".into(),
        )),
        _ => Ok(()),
    }
}

/// A task is active while it has no end date or ends after today.
pub fn task_is_active(end: Option<Date>, today: Date) -> bool {
    end.map_or(true, |d| d > today)
}

/// Days from start to the end date, or to today for open tasks.
pub fn task_duration_days(start: Date, end: Option<Date>, today: Date) -> i64 {
    (end.unwrap_or(today) - start).num_days()
}
