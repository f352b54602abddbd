//! Repository for the `user_permissions` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

/// Per-user permission grants.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Codenames granted to a user, sorted.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT codename FROM user_permissions WHERE user_id = $1 ORDER BY codename",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    /// Grant one permission. Granting twice is a no-op.
    pub async fn grant(pool: &PgPool, user_id: DbId, codename: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_permissions (user_id, codename) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(codename)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Replace all grants of a user in one transaction.
    pub async fn replace(
        pool: &PgPool,
        user_id: DbId,
        codenames: &[String],
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_permissions (user_id, codename)
             SELECT $1, UNNEST($2::text[])
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(codenames)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Self::list_for_user(pool, user_id).await
    }
}
