//! Clubhouse notification infrastructure.
//!
//! - [`delivery`]: the [`Mailer`] seam with the SMTP implementation and an
//!   in-memory one for tests.
//! - [`templates`]: built-in and stored email templates.
//! - [`NotificationService`]: order notifications with delivery logging and
//!   manual retry.

pub mod delivery;
pub mod notifications;
pub mod templates;

pub use delivery::email::{EmailConfig, EmailError, Mailer, MemoryMailer, OutgoingEmail, SmtpMailer};
pub use notifications::{DispatchReport, NotificationError, NotificationService, ReminderReport};
