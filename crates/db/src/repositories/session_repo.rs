//! Refresh-token sessions in `user_sessions`.
//!
//! A session is live while it is unused, unrevoked and unexpired. Spending a
//! token is a single conditional `UPDATE`, so two concurrent refreshes with
//! the same token cannot both succeed.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::{NewSession, SpentSession};

pub struct SessionRepo;

impl SessionRepo {
    pub async fn open(pool: &PgPool, session: &NewSession) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO user_sessions (user_id, token_hash, user_agent, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Mark the live session holding `token_hash` as used and return it.
    ///
    /// `None` for unknown, expired, revoked or already used tokens.
    pub async fn spend(pool: &PgPool, token_hash: &str) -> Result<Option<SpentSession>, sqlx::Error> {
        sqlx::query_as::<_, SpentSession>(
            "UPDATE user_sessions SET used_at = NOW()
             WHERE token_hash = $1
               AND used_at IS NULL
               AND revoked_at IS NULL
               AND expires_at > NOW()
             RETURNING id, user_id, user_agent",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Whether `token_hash` belongs to a session that was already used.
    /// A second use of a spent token signals a leaked token.
    pub async fn was_spent(pool: &PgPool, token_hash: &str) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT user_id FROM user_sessions WHERE token_hash = $1 AND used_at IS NOT NULL",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(user_id,)| user_id))
    }

    /// Revoke every live session of a user. Returns how many were revoked.
    pub async fn revoke_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = NOW()
             WHERE user_id = $1 AND revoked_at IS NULL AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Drop a user's expired and revoked sessions. Used tokens are kept
    /// until they expire so a replay can still be recognised.
    pub async fn purge_dead(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_sessions
             WHERE user_id = $1
               AND (revoked_at IS NOT NULL OR expires_at <= NOW())",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
