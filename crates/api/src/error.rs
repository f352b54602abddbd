use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clubhouse_core::error::CoreError;
use clubhouse_core::types::DbId;
use clubhouse_db::RepoError;
use clubhouse_events::NotificationError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as `{ "error": message, "code": CODE }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The resource exists but does not support this method.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// No superuser exists yet.
    #[error("Setup required")]
    SetupRequired,

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// `404` for a missing entity.
pub fn not_found(entity: &'static str, id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity, id })
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Rule(core) => AppError::Core(core),
            RepoError::Database(db) => AppError::Database(db),
        }
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::LogNotFound(id) => AppError::Core(CoreError::NotFound {
                entity: "NotificationLog",
                id,
            }),
            NotificationError::NotRetryable(_) => AppError::Core(CoreError::Conflict(err.to_string())),
            NotificationError::NoRecipient | NotificationError::NoTemplate(_) => {
                AppError::Core(CoreError::Validation(err.to_string()))
            }
            NotificationError::Database(db) => AppError::Database(db),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(describe_validation(&errors)))
    }
}

/// Flatten field errors into `field: code, field: code`.
fn describe_validation(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
            format!("{field}: {}", codes.join("/"))
        })
        .collect();
    if parts.is_empty() {
        return errors.to_string();
    }
    parts.sort();
    format!("Invalid input ({})", parts.join(", "))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::MethodNotAllowed(msg) => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                msg.clone(),
            ),
            AppError::SetupRequired => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SETUP_REQUIRED",
                "Initial setup required: create the first superuser via /api/v1/setup".to_string(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on `uq_*` constraints map to 409.
/// - Foreign-key violations map to 409 (the row is referenced or the
///   referenced row is missing).
/// - CHECK violations on `ck_*` constraints map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
                Some("23503") => {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Operation violates reference constraint: {constraint}"),
                    );
                }
                Some("23514") if constraint.starts_with("ck_") => {
                    return (
                        StatusCode::BAD_REQUEST,
                        "VALIDATION_ERROR",
                        format!("Value violates check constraint: {constraint}"),
                    );
                }
                _ => {}
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn validation_errors_name_fields() {
        let errors = Probe {
            name: String::new(),
            email: "nope".into(),
        }
        .validate()
        .unwrap_err();
        let msg = describe_validation(&errors);
        assert_eq!(msg, "Invalid input (email: email, name: length)");
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::Core(CoreError::NotFound { entity: "Member", id: 3 }), 404),
            (AppError::Core(CoreError::Validation("x".into())), 400),
            (AppError::Core(CoreError::Conflict("x".into())), 409),
            (AppError::Core(CoreError::Forbidden("x".into())), 403),
            (AppError::MethodNotAllowed("x".into()), 405),
            (AppError::SetupRequired, 503),
            (AppError::Database(sqlx::Error::RowNotFound), 404),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }

    #[test]
    fn notification_errors_map_to_http_semantics() {
        let status = |e: NotificationError| AppError::from(e).into_response().status().as_u16();
        assert_eq!(status(NotificationError::LogNotFound(9)), 404);
        assert_eq!(status(NotificationError::NotRetryable("sent".into())), 409);
        assert_eq!(status(NotificationError::NoRecipient), 400);
    }
}
