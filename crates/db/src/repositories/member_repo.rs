//! Repository for the `members` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::member::{
    CreateMember, Member, MemberListParams, MemberStatistics, StatusCount, UpdateMember,
};
use crate::{clamp_limit, clamp_offset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, lastname, birthday, email, street, zip_code, city, \
                        phone, mobile, notes, joined, identity_card_number, can_swim, \
                        group_id, status_id, user_id, created_at, updated_at";

/// Maps an `ordering` query value onto a fixed ORDER BY clause.
fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering {
        Some("name") => "name ASC, lastname ASC",
        Some("-name") => "name DESC, lastname DESC",
        Some("-lastname") => "lastname DESC, name DESC",
        Some("birthday") => "birthday ASC NULLS LAST, lastname ASC",
        Some("-birthday") => "birthday DESC NULLS LAST, lastname ASC",
        Some("joined") => "joined ASC NULLS LAST, lastname ASC",
        Some("-joined") => "joined DESC NULLS LAST, lastname ASC",
        _ => "lastname ASC, name ASC",
    }
}

/// Provides CRUD operations for members.
pub struct MemberRepo;

impl MemberRepo {
    pub async fn create(pool: &PgPool, input: &CreateMember) -> Result<Member, sqlx::Error> {
        let query = format!(
            "INSERT INTO members (name, lastname, birthday, email, street, zip_code, city,
                                  phone, mobile, notes, joined, identity_card_number, can_swim,
                                  group_id, status_id, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(&input.name)
            .bind(&input.lastname)
            .bind(input.birthday)
            .bind(&input.email)
            .bind(&input.street)
            .bind(&input.zip_code)
            .bind(&input.city)
            .bind(&input.phone)
            .bind(&input.mobile)
            .bind(&input.notes)
            .bind(input.joined)
            .bind(&input.identity_card_number)
            .bind(input.can_swim)
            .bind(input.group_id)
            .bind(input.status_id)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The member linked to a user account, if any.
    pub async fn find_by_user(pool: &PgPool, user_id: DbId) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE user_id = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List members with optional filters, search and ordering.
    pub async fn list(
        pool: &PgPool,
        params: &MemberListParams,
    ) -> Result<Vec<Member>, sqlx::Error> {
        let order = order_clause(params.ordering.as_deref());
        let query = format!(
            "SELECT {COLUMNS} FROM members
             WHERE ($1::BIGINT IS NULL OR status_id = $1)
               AND ($2::BIGINT IS NULL OR group_id = $2)
               AND ($3::BOOLEAN IS NULL OR can_swim = $3)
               AND ($4::TEXT IS NULL
                    OR name ILIKE '%' || $4 || '%'
                    OR lastname ILIKE '%' || $4 || '%'
                    OR email ILIKE '%' || $4 || '%'
                    OR identity_card_number ILIKE '%' || $4 || '%')
             ORDER BY {order}
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(params.status_id)
            .bind(params.group_id)
            .bind(params.can_swim)
            .bind(params.search.as_deref().filter(|s| !s.trim().is_empty()))
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMember,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!(
            "UPDATE members SET
                name = COALESCE($2, name),
                lastname = COALESCE($3, lastname),
                birthday = COALESCE($4, birthday),
                email = COALESCE($5, email),
                street = COALESCE($6, street),
                zip_code = COALESCE($7, zip_code),
                city = COALESCE($8, city),
                phone = COALESCE($9, phone),
                mobile = COALESCE($10, mobile),
                notes = COALESCE($11, notes),
                joined = COALESCE($12, joined),
                identity_card_number = COALESCE($13, identity_card_number),
                can_swim = COALESCE($14, can_swim),
                group_id = COALESCE($15, group_id),
                status_id = COALESCE($16, status_id),
                user_id = COALESCE($17, user_id)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.lastname)
            .bind(input.birthday)
            .bind(&input.email)
            .bind(&input.street)
            .bind(&input.zip_code)
            .bind(&input.city)
            .bind(&input.phone)
            .bind(&input.mobile)
            .bind(&input.notes)
            .bind(input.joined)
            .bind(&input.identity_card_number)
            .bind(input.can_swim)
            .bind(input.group_id)
            .bind(input.status_id)
            .bind(input.user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Total member count plus a breakdown per status.
    ///
    /// Members without a status are reported under a `None` status.
    pub async fn statistics(pool: &PgPool) -> Result<MemberStatistics, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
            .fetch_one(pool)
            .await?;
        let by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT s.id AS status_id, s.name, s.color, COUNT(m.id) AS count
             FROM members m
             LEFT JOIN member_statuses s ON s.id = m.status_id
             GROUP BY s.id, s.name, s.color
             ORDER BY s.name NULLS LAST",
        )
        .fetch_all(pool)
        .await?;
        Ok(MemberStatistics { total, by_status })
    }
}
