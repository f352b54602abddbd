//! Persistence layer: connection pool, embedded migrations, row models and
//! repositories for every club back office table.

use std::collections::HashSet;

use clubhouse_core::error::CoreError;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Migrations embedded at compile time from `crates/db/migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 100;

/// Maximum page size for list endpoints.
pub const MAX_LIMIT: i64 = 500;

/// Failure of a repository operation that enforces domain rules inside its
/// database transaction (ledger bookings, status changes).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of embedded migrations not yet applied successfully.
///
/// A missing migrations table counts every migration as pending.
pub async fn pending_migrations(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let applied: Vec<(i64,)> =
        match sqlx::query_as("SELECT version FROM _sqlx_migrations WHERE success = true")
            .fetch_all(pool)
            .await
        {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("42P01") => {
                Vec::new()
            }
            Err(e) => return Err(e),
        };
    let applied: HashSet<i64> = applied.into_iter().map(|(v,)| v).collect();
    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count())
}

/// Clamp a caller-provided page size.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Clamp a caller-provided offset.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_LIMIT);
        assert_eq!(clamp_offset(Some(-5)), 0);
    }
}
