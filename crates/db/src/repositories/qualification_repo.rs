//! Repositories for qualification types, qualifications, special task types
//! and special tasks.

use clubhouse_core::qualifications::DEFAULT_EXPIRY_WARNING_DAYS;
use clubhouse_core::types::{Date, DbId};
use sqlx::PgPool;

use crate::models::qualification::{
    CreateQualificationType, CreateSpecialTask, CreateSpecialTaskType, NewQualification,
    Qualification, QualificationCounts, QualificationListParams, QualificationType, SpecialTask,
    SpecialTaskListParams, SpecialTaskType, UpdateQualification, UpdateQualificationType,
    UpdateSpecialTask, UpdateSpecialTaskType,
};
use crate::{clamp_limit, clamp_offset};

/// Restricts queries to records of one person: the caller as user, or the
/// member linked to the caller.
#[derive(Debug, Clone, Copy)]
pub struct OwnerScope {
    pub user_id: DbId,
    pub member_id: Option<DbId>,
}

/// Renders the owning person: the member's full name, else the user's name.
const PERSON_NAME: &str = "COALESCE(TRIM(m.name || ' ' || m.lastname), \
    NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username, '')";

// ---------------------------------------------------------------------------
// Qualification types
// ---------------------------------------------------------------------------

const TYPE_COLUMNS: &str = "id, name, description, expires, validity_period, created_at, updated_at";

pub struct QualificationTypeRepo;

impl QualificationTypeRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateQualificationType,
    ) -> Result<QualificationType, sqlx::Error> {
        let query = format!(
            "INSERT INTO qualification_types (name, description, expires, validity_period)
             VALUES ($1, $2, $3, $4)
             RETURNING {TYPE_COLUMNS}"
        );
        sqlx::query_as::<_, QualificationType>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.expires)
            .bind(input.validity_period)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<QualificationType>, sqlx::Error> {
        let query = format!("SELECT {TYPE_COLUMNS} FROM qualification_types WHERE id = $1");
        sqlx::query_as::<_, QualificationType>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<QualificationType>, sqlx::Error> {
        let query = format!("SELECT {TYPE_COLUMNS} FROM qualification_types ORDER BY name");
        sqlx::query_as::<_, QualificationType>(&query)
            .fetch_all(pool)
            .await
    }

    /// `expires` and `validity_period` are written together; the caller
    /// passes the merged, validated pair.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateQualificationType,
        expires: bool,
        validity_period: Option<i32>,
    ) -> Result<Option<QualificationType>, sqlx::Error> {
        let query = format!(
            "UPDATE qualification_types SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                expires = $4,
                validity_period = $5
             WHERE id = $1
             RETURNING {TYPE_COLUMNS}"
        );
        sqlx::query_as::<_, QualificationType>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(expires)
            .bind(validity_period)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM qualification_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Qualifications
// ---------------------------------------------------------------------------

fn qualification_select() -> String {
    format!(
        "SELECT q.id, q.qualification_type_id, t.name AS type_name, q.user_id, q.member_id, \
         {PERSON_NAME} AS person_name, q.date_acquired, q.date_expires, q.issued_by, q.note, \
         q.created_at, q.updated_at \
         FROM qualifications q \
         JOIN qualification_types t ON t.id = q.qualification_type_id \
         LEFT JOIN members m ON m.id = q.member_id \
         LEFT JOIN users u ON u.id = q.user_id"
    )
}

pub struct QualificationRepo;

impl QualificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewQualification,
    ) -> Result<Qualification, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO qualifications
                (qualification_type_id, user_id, member_id, date_acquired, date_expires,
                 issued_by, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.qualification_type_id)
        .bind(input.user_id)
        .bind(input.member_id)
        .bind(input.date_acquired)
        .bind(input.date_expires)
        .bind(&input.issued_by)
        .bind(&input.note)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Qualification>, sqlx::Error> {
        let query = format!("{} WHERE q.id = $1", qualification_select());
        sqlx::query_as::<_, Qualification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Qualifications matching the filters, newest acquisition first.
    ///
    /// `status` is one of `active`, `expired` or `expiring`, evaluated
    /// against `today`.
    pub async fn list(
        pool: &PgPool,
        params: &QualificationListParams,
        scope: Option<OwnerScope>,
        today: Date,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let query = format!(
            "{}
             WHERE ($1::BIGINT IS NULL OR q.qualification_type_id = $1)
               AND ($2::BIGINT IS NULL OR q.user_id = $2)
               AND ($3::BIGINT IS NULL OR q.member_id = $3)
               AND ($4::TEXT IS NULL OR {PERSON_NAME} ILIKE '%' || $4 || '%'
                    OR t.name ILIKE '%' || $4 || '%')
               AND (CASE $5::TEXT
                    WHEN 'active' THEN q.date_expires IS NULL OR q.date_expires >= $6
                    WHEN 'expired' THEN q.date_expires < $6
                    WHEN 'expiring' THEN q.date_expires >= $6 AND q.date_expires <= $6 + $7::INT
                    ELSE true END)
               AND ($8::BIGINT IS NULL OR q.user_id = $8 OR q.member_id = $9)
             ORDER BY q.date_acquired DESC, q.id DESC
             LIMIT $10 OFFSET $11",
            qualification_select()
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(params.qualification_type_id)
            .bind(params.user_id)
            .bind(params.member_id)
            .bind(params.search.as_deref().filter(|s| !s.trim().is_empty()))
            .bind(params.status.as_deref())
            .bind(today)
            .bind(DEFAULT_EXPIRY_WARNING_DAYS as i32)
            .bind(scope.map(|s| s.user_id))
            .bind(scope.and_then(|s| s.member_id))
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Most recently acquired qualifications.
    pub async fn recent(
        pool: &PgPool,
        scope: Option<OwnerScope>,
        limit: i64,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let query = format!(
            "{}
             WHERE ($1::BIGINT IS NULL OR q.user_id = $1 OR q.member_id = $2)
             ORDER BY q.date_acquired DESC, q.id DESC
             LIMIT $3",
            qualification_select()
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(scope.map(|s| s.user_id))
            .bind(scope.and_then(|s| s.member_id))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Not yet expired qualifications ordered by expiry date, soonest first.
    pub async fn expiring(
        pool: &PgPool,
        scope: Option<OwnerScope>,
        today: Date,
        limit: i64,
    ) -> Result<Vec<Qualification>, sqlx::Error> {
        let query = format!(
            "{}
             WHERE q.date_expires IS NOT NULL AND q.date_expires >= $1
               AND ($2::BIGINT IS NULL OR q.user_id = $2 OR q.member_id = $3)
             ORDER BY q.date_expires, q.id
             LIMIT $4",
            qualification_select()
        );
        sqlx::query_as::<_, Qualification>(&query)
            .bind(today)
            .bind(scope.map(|s| s.user_id))
            .bind(scope.and_then(|s| s.member_id))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateQualification,
    ) -> Result<Option<Qualification>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE qualifications SET
                date_acquired = COALESCE($2, date_acquired),
                date_expires = COALESCE($3, date_expires),
                issued_by = COALESCE($4, issued_by),
                note = COALESCE($5, note)
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.date_acquired)
        .bind(input.date_expires)
        .bind(&input.issued_by)
        .bind(&input.note)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM qualifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Dashboard counters, evaluated against `today`.
    pub async fn counts(
        pool: &PgPool,
        scope: Option<OwnerScope>,
        today: Date,
    ) -> Result<QualificationCounts, sqlx::Error> {
        sqlx::query_as::<_, QualificationCounts>(
            "SELECT
                (SELECT COUNT(*) FROM qualifications q
                  WHERE ($1::BIGINT IS NULL OR q.user_id = $1 OR q.member_id = $2))
                    AS total_qualifications,
                (SELECT COUNT(*) FROM qualifications q
                  WHERE q.date_expires < $3
                    AND ($1::BIGINT IS NULL OR q.user_id = $1 OR q.member_id = $2))
                    AS expired_qualifications,
                (SELECT COUNT(*) FROM qualifications q
                  WHERE q.date_expires >= $3 AND q.date_expires <= $3 + $4::INT
                    AND ($1::BIGINT IS NULL OR q.user_id = $1 OR q.member_id = $2))
                    AS expiring_qualifications,
                (SELECT COUNT(*) FROM special_tasks s
                  WHERE (s.end_date IS NULL OR s.end_date > $3)
                    AND ($1::BIGINT IS NULL OR s.user_id = $1 OR s.member_id = $2))
                    AS active_tasks,
                (SELECT COUNT(*) FROM special_tasks s
                  WHERE s.end_date <= $3
                    AND ($1::BIGINT IS NULL OR s.user_id = $1 OR s.member_id = $2))
                    AS completed_tasks",
        )
        .bind(scope.map(|s| s.user_id))
        .bind(scope.and_then(|s| s.member_id))
        .bind(today)
        .bind(DEFAULT_EXPIRY_WARNING_DAYS as i32)
        .fetch_one(pool)
        .await
    }
}

// ---------------------------------------------------------------------------
// Special task types
// ---------------------------------------------------------------------------

const TASK_TYPE_COLUMNS: &str = "id, name, description, created_at, updated_at";

pub struct SpecialTaskTypeRepo;

impl SpecialTaskTypeRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateSpecialTaskType,
    ) -> Result<SpecialTaskType, sqlx::Error> {
        let query = format!(
            "INSERT INTO special_task_types (name, description) VALUES ($1, $2)
             RETURNING {TASK_TYPE_COLUMNS}"
        );
        sqlx::query_as::<_, SpecialTaskType>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SpecialTaskType>, sqlx::Error> {
        let query = format!("SELECT {TASK_TYPE_COLUMNS} FROM special_task_types WHERE id = $1");
        sqlx::query_as::<_, SpecialTaskType>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<SpecialTaskType>, sqlx::Error> {
        let query = format!("SELECT {TASK_TYPE_COLUMNS} FROM special_task_types ORDER BY name");
        sqlx::query_as::<_, SpecialTaskType>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSpecialTaskType,
    ) -> Result<Option<SpecialTaskType>, sqlx::Error> {
        let query = format!(
            "UPDATE special_task_types SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {TASK_TYPE_COLUMNS}"
        );
        sqlx::query_as::<_, SpecialTaskType>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM special_task_types WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Special tasks
// ---------------------------------------------------------------------------

fn task_select() -> String {
    format!(
        "SELECT s.id, s.task_type_id, t.name AS task_name, s.user_id, s.member_id, \
         {PERSON_NAME} AS person_name, s.start_date, s.end_date, s.note, \
         s.created_at, s.updated_at \
         FROM special_tasks s \
         JOIN special_task_types t ON t.id = s.task_type_id \
         LEFT JOIN members m ON m.id = s.member_id \
         LEFT JOIN users u ON u.id = s.user_id"
    )
}

pub struct SpecialTaskRepo;

impl SpecialTaskRepo {
    pub async fn create(pool: &PgPool, input: &CreateSpecialTask) -> Result<SpecialTask, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO special_tasks (task_type_id, user_id, member_id, start_date, end_date, note)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(input.task_type_id)
        .bind(input.user_id)
        .bind(input.member_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.note)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SpecialTask>, sqlx::Error> {
        let query = format!("{} WHERE s.id = $1", task_select());
        sqlx::query_as::<_, SpecialTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks matching the filters, latest start first. `status` is `active`
    /// or `completed`.
    pub async fn list(
        pool: &PgPool,
        params: &SpecialTaskListParams,
        scope: Option<OwnerScope>,
        today: Date,
    ) -> Result<Vec<SpecialTask>, sqlx::Error> {
        let query = format!(
            "{}
             WHERE ($1::BIGINT IS NULL OR s.task_type_id = $1)
               AND ($2::BIGINT IS NULL OR s.user_id = $2)
               AND ($3::BIGINT IS NULL OR s.member_id = $3)
               AND ($4::TEXT IS NULL OR {PERSON_NAME} ILIKE '%' || $4 || '%'
                    OR t.name ILIKE '%' || $4 || '%')
               AND (CASE $5::TEXT
                    WHEN 'active' THEN s.end_date IS NULL OR s.end_date > $6
                    WHEN 'completed' THEN s.end_date <= $6
                    ELSE true END)
               AND ($7::BIGINT IS NULL OR s.user_id = $7 OR s.member_id = $8)
             ORDER BY s.start_date DESC, s.id DESC
             LIMIT $9 OFFSET $10",
            task_select()
        );
        sqlx::query_as::<_, SpecialTask>(&query)
            .bind(params.task_type_id)
            .bind(params.user_id)
            .bind(params.member_id)
            .bind(params.search.as_deref().filter(|s| !s.trim().is_empty()))
            .bind(params.status.as_deref())
            .bind(today)
            .bind(scope.map(|s| s.user_id))
            .bind(scope.and_then(|s| s.member_id))
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Active tasks, latest start first.
    pub async fn current(
        pool: &PgPool,
        scope: Option<OwnerScope>,
        today: Date,
        limit: i64,
    ) -> Result<Vec<SpecialTask>, sqlx::Error> {
        let params = SpecialTaskListParams {
            status: Some("active".into()),
            limit: Some(limit),
            ..Default::default()
        };
        Self::list(pool, &params, scope, today).await
    }

    /// The person of a task is fixed; dates and note may change.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSpecialTask,
    ) -> Result<Option<SpecialTask>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE special_tasks SET
                start_date = COALESCE($2, start_date),
                end_date = COALESCE($3, end_date),
                note = COALESCE($4, note)
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.note)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM special_tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
