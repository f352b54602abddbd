//! Repository for the `member_events` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::member::{CreateMemberEvent, MemberEvent, UpdateMemberEvent};

const SELECT: &str = "SELECT e.id, e.member_id, e.event_type_id, t.name AS event_type_name, \
                      e.date, e.notes, e.created_at, e.updated_at \
                      FROM member_events e JOIN event_types t ON t.id = e.event_type_id";

pub struct MemberEventRepo;

impl MemberEventRepo {
    pub async fn create(
        pool: &PgPool,
        member_id: DbId,
        input: &CreateMemberEvent,
    ) -> Result<MemberEvent, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO member_events (member_id, event_type_id, date, notes)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(member_id)
        .bind(input.event_type_id)
        .bind(input.date)
        .bind(&input.notes)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MemberEvent>, sqlx::Error> {
        let query = format!("{SELECT} WHERE e.id = $1");
        sqlx::query_as::<_, MemberEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Events of one member, newest first.
    pub async fn list_for_member(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Vec<MemberEvent>, sqlx::Error> {
        let query = format!("{SELECT} WHERE e.member_id = $1 ORDER BY e.date DESC, e.id DESC");
        sqlx::query_as::<_, MemberEvent>(&query)
            .bind(member_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMemberEvent,
    ) -> Result<Option<MemberEvent>, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE member_events SET
                event_type_id = COALESCE($2, event_type_id),
                date = COALESCE($3, date),
                notes = COALESCE($4, notes)
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.event_type_id)
        .bind(input.date)
        .bind(&input.notes)
        .execute(pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM member_events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
