//! Repositories for the servicebook: `services`, their managers and
//! `attendances`.

use std::collections::HashMap;

use clubhouse_core::attendance::{AttendanceState, StateCounts};
use clubhouse_core::types::{Date, DbId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::service::{
    Attendance, AttendanceEntry, CreateService, MemberStateCount, Service, ServiceAttendanceCounts,
    ServiceListParams, StateCountRow, UpdateService,
};
use crate::{clamp_limit, clamp_offset};

const COLUMNS: &str = "id, start_at, end_at, place, topic, description, events, \
                        created_at, updated_at";

pub struct ServiceRepo;

impl ServiceRepo {
    pub async fn create(pool: &PgPool, input: &CreateService) -> Result<Service, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO services (start_at, end_at, place, topic, description, events)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let service = sqlx::query_as::<_, Service>(&query)
            .bind(input.start_at)
            .bind(input.end_at)
            .bind(&input.place)
            .bind(&input.topic)
            .bind(&input.description)
            .bind(&input.events)
            .fetch_one(&mut *tx)
            .await?;
        set_managers(&mut tx, service.id, &input.operations_managers).await?;
        tx.commit().await?;
        Ok(service)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Service>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM services WHERE id = $1");
        sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Services, newest first, optionally bounded by start date.
    pub async fn list(
        pool: &PgPool,
        params: &ServiceListParams,
    ) -> Result<Vec<Service>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM services
             WHERE ($1::DATE IS NULL OR (start_at AT TIME ZONE 'UTC')::DATE >= $1)
               AND ($2::DATE IS NULL OR (start_at AT TIME ZONE 'UTC')::DATE <= $2)
               AND ($3::TEXT IS NULL OR topic ILIKE '%' || $3 || '%'
                    OR place ILIKE '%' || $3 || '%')
             ORDER BY start_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Service>(&query)
            .bind(params.from)
            .bind(params.to)
            .bind(params.search.as_deref().filter(|s| !s.trim().is_empty()))
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Update a service. Managers are replaced when present.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateService,
    ) -> Result<Option<Service>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE services SET
                start_at = COALESCE($2, start_at),
                end_at = COALESCE($3, end_at),
                place = COALESCE($4, place),
                topic = COALESCE($5, topic),
                description = COALESCE($6, description),
                events = COALESCE($7, events)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let service = sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .bind(input.start_at)
            .bind(input.end_at)
            .bind(&input.place)
            .bind(&input.topic)
            .bind(&input.description)
            .bind(&input.events)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(service) = service else {
            return Ok(None);
        };
        if let Some(managers) = &input.operations_managers {
            set_managers(&mut tx, id, managers).await?;
        }
        tx.commit().await?;
        Ok(Some(service))
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Operations managers per service.
    pub async fn managers_for(
        pool: &PgPool,
        service_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<DbId>>, sqlx::Error> {
        let rows: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT service_id, user_id FROM service_managers
             WHERE service_id = ANY($1)
             ORDER BY service_id, user_id",
        )
        .bind(service_ids)
        .fetch_all(pool)
        .await?;
        let mut map: HashMap<DbId, Vec<DbId>> = HashMap::new();
        for (service_id, user_id) in rows {
            map.entry(service_id).or_default().push(user_id);
        }
        Ok(map)
    }
}

async fn set_managers(
    tx: &mut Transaction<'_, Postgres>,
    service_id: DbId,
    managers: &[DbId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM service_managers WHERE service_id = $1")
        .bind(service_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO service_managers (service_id, user_id)
         SELECT $1, UNNEST($2::bigint[])
         ON CONFLICT DO NOTHING",
    )
    .bind(service_id)
    .bind(managers)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

const ATTENDANCE_SELECT: &str = "SELECT a.id, a.service_id, s.start_at AS service_start, \
    s.topic AS service_topic, a.member_id, TRIM(m.name || ' ' || m.lastname) AS member_name, \
    a.state, a.created_at, a.updated_at \
    FROM attendances a \
    JOIN services s ON s.id = a.service_id \
    JOIN members m ON m.id = a.member_id";

pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Replace the attendance list of a service.
    pub async fn replace_for_service(
        pool: &PgPool,
        service_id: DbId,
        entries: &[AttendanceEntry],
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let members: Vec<DbId> = entries.iter().map(|e| e.member_id).collect();
        sqlx::query("DELETE FROM attendances WHERE service_id = $1 AND NOT (member_id = ANY($2))")
            .bind(service_id)
            .bind(&members)
            .execute(&mut *tx)
            .await?;
        for entry in entries {
            upsert(&mut tx, service_id, entry.member_id, entry.state).await?;
        }
        tx.commit().await?;
        Self::list_for_service(pool, service_id).await
    }

    /// Record or change one member's state for a service.
    pub async fn set_state(
        pool: &PgPool,
        service_id: DbId,
        member_id: DbId,
        state: AttendanceState,
    ) -> Result<Attendance, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = upsert(&mut tx, service_id, member_id, state).await?;
        tx.commit().await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Attendance>, sqlx::Error> {
        let query = format!("{ATTENDANCE_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, Attendance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_service(
        pool: &PgPool,
        service_id: DbId,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "{ATTENDANCE_SELECT} WHERE a.service_id = $1 ORDER BY m.lastname, m.name"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(service_id)
            .fetch_all(pool)
            .await
    }

    /// A member's attendance history, newest service first.
    pub async fn list_for_member(
        pool: &PgPool,
        member_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "{ATTENDANCE_SELECT} WHERE a.member_id = $1
             ORDER BY s.start_at DESC, a.id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(member_id)
            .bind(clamp_limit(limit))
            .fetch_all(pool)
            .await
    }

    /// States of a member's `limit` most recent services.
    pub async fn recent_states(
        pool: &PgPool,
        member_id: DbId,
        limit: i64,
    ) -> Result<Vec<AttendanceState>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT a.state FROM attendances a
             JOIN services s ON s.id = a.service_id
             WHERE a.member_id = $1
             ORDER BY s.start_at DESC, a.id DESC
             LIMIT $2",
        )
        .bind(member_id)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(state,)| state.parse().ok())
            .collect())
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attendances WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A/E/F counts per service.
    pub async fn summaries(
        pool: &PgPool,
        service_ids: &[DbId],
    ) -> Result<HashMap<DbId, StateCounts>, sqlx::Error> {
        let rows = sqlx::query_as::<_, StateCountRow>(
            "SELECT service_id AS key, state, COUNT(*) AS count
             FROM attendances
             WHERE service_id = ANY($1)
             GROUP BY service_id, state",
        )
        .bind(service_ids)
        .fetch_all(pool)
        .await?;
        Ok(fold_counts(rows))
    }

    /// A/E/F counts over all services of a member.
    pub async fn member_counts(pool: &PgPool, member_id: DbId) -> Result<StateCounts, sqlx::Error> {
        let rows = sqlx::query_as::<_, StateCountRow>(
            "SELECT member_id AS key, state, COUNT(*) AS count
             FROM attendances
             WHERE member_id = $1
             GROUP BY member_id, state",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;
        Ok(fold_counts(rows).remove(&member_id).unwrap_or_default())
    }

    /// Members with the most attendances in `state`.
    pub async fn top_members(
        pool: &PgPool,
        state: AttendanceState,
        limit: i64,
    ) -> Result<Vec<MemberStateCount>, sqlx::Error> {
        sqlx::query_as::<_, MemberStateCount>(
            "SELECT a.member_id, TRIM(m.name || ' ' || m.lastname) AS member_name,
                    COUNT(*) AS count
             FROM attendances a
             JOIN members m ON m.id = a.member_id
             WHERE a.state = $1
             GROUP BY a.member_id, m.name, m.lastname
             ORDER BY count DESC, m.lastname, m.name
             LIMIT $2",
        )
        .bind(state.code())
        .bind(limit.max(1))
        .fetch_all(pool)
        .await
    }

    /// A/E/F totals per service within an optional date range, ordered by
    /// start. Services without attendance report zeros.
    pub async fn counts_per_service(
        pool: &PgPool,
        from: Option<Date>,
        to: Option<Date>,
    ) -> Result<Vec<ServiceAttendanceCounts>, sqlx::Error> {
        sqlx::query_as::<_, ServiceAttendanceCounts>(
            "SELECT s.id AS service_id, s.start_at,
                    COUNT(a.id) FILTER (WHERE a.state = 'A') AS present,
                    COUNT(a.id) FILTER (WHERE a.state = 'E') AS excused,
                    COUNT(a.id) FILTER (WHERE a.state = 'F') AS missing
             FROM services s
             LEFT JOIN attendances a ON a.service_id = s.id
             WHERE ($1::DATE IS NULL OR (s.start_at AT TIME ZONE 'UTC')::DATE >= $1)
               AND ($2::DATE IS NULL OR (s.start_at AT TIME ZONE 'UTC')::DATE <= $2)
             GROUP BY s.id, s.start_at
             ORDER BY s.start_at, s.id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}

async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    service_id: DbId,
    member_id: DbId,
    state: AttendanceState,
) -> Result<DbId, sqlx::Error> {
    let (id,): (DbId,) = sqlx::query_as(
        "INSERT INTO attendances (service_id, member_id, state) VALUES ($1, $2, $3)
         ON CONFLICT ON CONSTRAINT uq_attendances_service_member
         DO UPDATE SET state = EXCLUDED.state
         RETURNING id",
    )
    .bind(service_id)
    .bind(member_id)
    .bind(state.code())
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

fn fold_counts(rows: Vec<StateCountRow>) -> HashMap<DbId, StateCounts> {
    let mut map: HashMap<DbId, StateCounts> = HashMap::new();
    for row in rows {
        if let Ok(state) = row.state.parse::<AttendanceState>() {
            map.entry(row.key).or_default().add(state, row.count);
        }
    }
    map
}
