use clubhouse_events::EmailConfig;

use crate::auth::jwt::JwtConfig;

/// A required environment variable is missing or unparsable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// SMTP fallback used when the `email` settings section has no host.
    pub email: Option<EmailConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    ///
    /// JWT and SMTP variables are documented on [`JwtConfig::from_env`] and
    /// [`EmailConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_parse("PORT", 3000u16)?;
        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );
        let request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = env_parse("SHUTDOWN_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env()?,
            email: EmailConfig::from_env(),
        })
    }
}

/// Read and parse `var`, falling back to `default` when unset.
pub(crate) fn env_parse<T: std::str::FromStr>(
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn unset_variable_uses_default() {
        let value = env_parse("CLUBHOUSE_TEST_UNSET_VARIABLE", 42u16).unwrap();
        assert_eq!(value, 42);
    }
}
