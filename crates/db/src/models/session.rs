//! Refresh-token sessions.

use clubhouse_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Insert payload for a freshly issued refresh token.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub expires_at: Timestamp,
}

/// What is left of a session after its token was spent on a refresh.
#[derive(Debug, Clone, FromRow)]
pub struct SpentSession {
    pub id: DbId,
    pub user_id: DbId,
    pub user_agent: Option<String>,
}
