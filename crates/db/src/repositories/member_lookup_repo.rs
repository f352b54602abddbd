//! Repositories for the small member lookup tables: statuses, groups and
//! event types.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::member::{
    CreateMemberStatus, EventType, MemberGroup, MemberStatus, UpdateMemberStatus,
};

const STATUS_COLUMNS: &str = "id, name, color, created_at, updated_at";
const NAMED_COLUMNS: &str = "id, name, created_at, updated_at";

/// Default color for member statuses without an explicit one.
pub const DEFAULT_STATUS_COLOR: &str = "#FF0000";

pub struct MemberStatusRepo;

impl MemberStatusRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateMemberStatus,
    ) -> Result<MemberStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO member_statuses (name, color) VALUES ($1, $2)
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, MemberStatus>(&query)
            .bind(&input.name)
            .bind(input.color.as_deref().unwrap_or(DEFAULT_STATUS_COLOR))
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<MemberStatus>, sqlx::Error> {
        let query = format!("SELECT {STATUS_COLUMNS} FROM member_statuses ORDER BY name");
        sqlx::query_as::<_, MemberStatus>(&query).fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMemberStatus,
    ) -> Result<Option<MemberStatus>, sqlx::Error> {
        let query = format!(
            "UPDATE member_statuses SET
                name = COALESCE($2, name),
                color = COALESCE($3, color)
             WHERE id = $1
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, MemberStatus>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.color)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM member_statuses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct MemberGroupRepo;

impl MemberGroupRepo {
    pub async fn create(pool: &PgPool, name: &str) -> Result<MemberGroup, sqlx::Error> {
        let query =
            format!("INSERT INTO member_groups (name) VALUES ($1) RETURNING {NAMED_COLUMNS}");
        sqlx::query_as::<_, MemberGroup>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<MemberGroup>, sqlx::Error> {
        let query = format!("SELECT {NAMED_COLUMNS} FROM member_groups ORDER BY name");
        sqlx::query_as::<_, MemberGroup>(&query).fetch_all(pool).await
    }

    pub async fn rename(
        pool: &PgPool,
        id: DbId,
        name: &str,
    ) -> Result<Option<MemberGroup>, sqlx::Error> {
        let query = format!(
            "UPDATE member_groups SET name = $2 WHERE id = $1 RETURNING {NAMED_COLUMNS}"
        );
        sqlx::query_as::<_, MemberGroup>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM member_groups WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct EventTypeRepo;

impl EventTypeRepo {
    pub async fn create(pool: &PgPool, name: &str) -> Result<EventType, sqlx::Error> {
        let query =
            format!("INSERT INTO event_types (name) VALUES ($1) RETURNING {NAMED_COLUMNS}");
        sqlx::query_as::<_, EventType>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<EventType>, sqlx::Error> {
        let query = format!("SELECT {NAMED_COLUMNS} FROM event_types ORDER BY name");
        sqlx::query_as::<_, EventType>(&query).fetch_all(pool).await
    }

    pub async fn rename(
        pool: &PgPool,
        id: DbId,
        name: &str,
    ) -> Result<Option<EventType>, sqlx::Error> {
        let query =
            format!("UPDATE event_types SET name = $2 WHERE id = $1 RETURNING {NAMED_COLUMNS}");
        sqlx::query_as::<_, EventType>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Fails with a foreign key violation while events still reference the type.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM event_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
