//! Bootstrap gate: until a superuser exists, everything except health and
//! the setup endpoints answers 503 `SETUP_REQUIRED`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clubhouse_db::repositories::UserRepo;

use crate::error::AppError;
use crate::state::AppState;

const EXEMPT_PREFIXES: &[&str] = &["/health", "/api/v1/setup"];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Layer with `axum::middleware::from_fn_with_state(state, setup_gate)`.
///
/// Once a superuser is seen the state latch is set and the database is no
/// longer consulted.
pub async fn setup_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.is_setup_complete() || is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    match UserRepo::superuser_exists(&state.pool).await {
        Ok(true) => {
            state.mark_setup_complete();
            tracing::info!("Superuser present, setup gate opened");
            next.run(request).await
        }
        Ok(false) => AppError::SetupRequired.into_response(),
        Err(e) => AppError::Database(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api/v1/setup"));
        assert!(is_exempt("/api/v1/setup/status"));
        assert!(!is_exempt("/api/v1/setupx"));
        assert!(!is_exempt("/api/v1/members"));
        assert!(!is_exempt("/api/v1/auth/login"));
    }
}
