//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] resolves its SMTP configuration on every send: the `email`
//! settings section wins when `email_host` is set, otherwise the environment
//! configuration loaded by [`EmailConfig::from_env`] is used. Without either,
//! sends fail with [`EmailError::NotConfigured`].

use std::sync::Mutex;

use async_trait::async_trait;
use clubhouse_core::preferences::{
    EMAIL_DEFAULT_FROM, EMAIL_HOST, EMAIL_HOST_PASSWORD, EMAIL_HOST_USER, EMAIL_PORT,
    EMAIL_USE_SSL, EMAIL_USE_TLS,
};
use clubhouse_db::repositories::PreferenceRepo;
use clubhouse_db::DbPool;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Neither the settings nor the environment name an SMTP host.
    #[error("email delivery not configured")]
    NotConfigured,

    /// The `email` settings section could not be read.
    #[error("Failed to load email settings: {0}")]
    Settings(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when none is configured.
const DEFAULT_FROM_ADDRESS: &str = "noreply@clubhouse.local";

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Tls,
    /// Plain connection upgraded with STARTTLS.
    StartTls,
    /// Unencrypted; only for local relays.
    None,
}

/// Configuration for the SMTP transport.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub security: SmtpSecurity,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      |                            |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@clubhouse.local`  |
    /// | `SMTP_USER`     | no       |                            |
    /// | `SMTP_PASSWORD` | no       |                            |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            security: SmtpSecurity::StartTls,
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }

    /// Load configuration from the `email` settings section.
    ///
    /// Returns `None` when `email_host` is blank. Implicit TLS wins over
    /// STARTTLS when both flags are set.
    pub async fn from_settings(pool: &DbPool) -> Result<Option<Self>, sqlx::Error> {
        let smtp_host = PreferenceRepo::get_string(pool, EMAIL_HOST).await?;
        if smtp_host.trim().is_empty() {
            return Ok(None);
        }
        let port = PreferenceRepo::get_i64(pool, EMAIL_PORT).await?;
        let use_ssl = PreferenceRepo::get_bool(pool, EMAIL_USE_SSL).await?;
        let use_tls = PreferenceRepo::get_bool(pool, EMAIL_USE_TLS).await?;
        let user = PreferenceRepo::get_string(pool, EMAIL_HOST_USER).await?;
        let password = PreferenceRepo::get_string(pool, EMAIL_HOST_PASSWORD).await?;
        let from = PreferenceRepo::get_string(pool, EMAIL_DEFAULT_FROM).await?;

        Ok(Some(Self {
            smtp_host: smtp_host.trim().to_string(),
            smtp_port: u16::try_from(port).unwrap_or(DEFAULT_SMTP_PORT),
            security: match (use_ssl, use_tls) {
                (true, _) => SmtpSecurity::Tls,
                (false, true) => SmtpSecurity::StartTls,
                (false, false) => SmtpSecurity::None,
            },
            from_address: non_empty(from).unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: non_empty(user),
            smtp_password: non_empty(password),
        }))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

/// Sends rendered emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP mailer whose configuration follows the runtime settings.
pub struct SmtpMailer {
    pool: DbPool,
    env_config: Option<EmailConfig>,
}

impl SmtpMailer {
    pub fn new(pool: DbPool, env_config: Option<EmailConfig>) -> Self {
        Self { pool, env_config }
    }

    /// The configuration a send would use right now.
    pub async fn resolve_config(&self) -> Result<EmailConfig, EmailError> {
        if let Some(config) = EmailConfig::from_settings(&self.pool).await? {
            return Ok(config);
        }
        self.env_config.clone().ok_or(EmailError::NotConfigured)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        use lettre::{
            message::MultiPart, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let config = self.resolve_config().await?;

        let builder = Message::builder()
            .from(config.from_address.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone());
        let message = match &email.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                html.clone(),
            )),
            None => builder.body(email.text_body.clone()),
        }
        .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        }
        .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Notification email sent");
        Ok(())
    }
}

/// In-memory mailer that records every message instead of sending it.
///
/// Used by the test suites; can be switched to fail every send.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failure: Mutex<Option<String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `reason`, or succeed again with `None`.
    pub fn set_failure(&self, reason: Option<&str>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = reason.map(str::to_string);
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        if let Some(reason) = failure {
            return Err(EmailError::Build(reason));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingEmail {
        OutgoingEmail {
            to: "kasse@example.org".into(),
            subject: "Hallo".into(),
            text_body: "Text".into(),
            html_body: None,
        }
    }

    #[test]
    fn email_error_display_not_configured() {
        assert_eq!(EmailError::NotConfigured.to_string(), "email delivery not configured");
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" user ".into()), Some("user".into()));
    }

    #[tokio::test]
    async fn memory_mailer_records_and_fails_on_demand() {
        let mailer = MemoryMailer::new();
        mailer.send(&message()).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);

        mailer.set_failure(Some("relay down"));
        let err = mailer.send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("relay down"));
        assert_eq!(mailer.sent().len(), 1);

        mailer.set_failure(None);
        mailer.send(&message()).await.unwrap();
        assert_eq!(mailer.sent().len(), 2);
    }
}
