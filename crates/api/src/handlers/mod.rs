//! Request handlers, one module per resource area.
//!
//! Handlers check permissions through the [`Principal`](crate::middleware::permissions::Principal)
//! extractor, delegate to the repositories in `clubhouse_db` and map errors
//! via [`AppError`](crate::error::AppError).

pub mod auth;
pub mod inventory;
pub mod members;
pub mod notifications;
pub mod orders;
pub mod qualifications;
pub mod servicebook;
pub mod settings;
pub mod setup;
pub mod users;

use clubhouse_core::types::Date;

/// The current local calendar date, used for ages and expiry checks.
pub(crate) fn today() -> Date {
    chrono::Local::now().date_naive()
}
