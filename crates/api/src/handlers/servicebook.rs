//! Handlers for services, attendance lists and attendance statistics.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::attendance::{
    attendance_series, check_alert, service_window, validate_service_times, AttendanceAlert,
    AttendanceState, StateCounts, DEFAULT_TOP_LIMIT,
};
use clubhouse_core::permissions::{ATTENDANCE, SERVICE};
use clubhouse_core::preferences::{
    parse_time, MEMBERS_ALERT_LAST_ENTRIES, MEMBERS_ALERT_THRESHOLD, SERVICE_END_TIME,
    SERVICE_START_TIME,
};
use clubhouse_core::types::{Date, DbId};
use clubhouse_db::models::service::{
    Attendance, AttendanceEntry, CreateService, Service, ServiceDefaults, ServiceListParams,
    ServiceResponse, SetAttendanceRequest, UpdateAttendance, UpdateService,
};
use clubhouse_db::repositories::{AttendanceRepo, MemberRepo, PreferenceRepo, ServiceRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::today;
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::permissions::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

/// Attach managers and attendance summaries to a batch of services.
async fn with_summaries(state: &AppState, services: Vec<Service>) -> AppResult<Vec<ServiceResponse>> {
    let ids: Vec<DbId> = services.iter().map(|s| s.id).collect();
    let mut managers = ServiceRepo::managers_for(&state.pool, &ids).await?;
    let summaries = AttendanceRepo::summaries(&state.pool, &ids).await?;
    Ok(services
        .into_iter()
        .map(|service| ServiceResponse {
            operations_managers: managers.remove(&service.id).unwrap_or_default(),
            summary: summaries.get(&service.id).copied().unwrap_or_default(),
            service,
        })
        .collect())
}

async fn service_response(state: &AppState, service: Service) -> AppResult<ServiceResponse> {
    let mut responses = with_summaries(state, vec![service]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::InternalError("Service summary missing".into()))
}

async fn ensure_service(state: &AppState, id: DbId) -> AppResult<()> {
    ServiceRepo::find_by_id(&state.pool, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| not_found("Service", id))
}

async fn ensure_member(state: &AppState, id: DbId) -> AppResult<()> {
    MemberRepo::find_by_id(&state.pool, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| not_found("Member", id))
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// GET /api/v1/servicebook/services
///
/// Newest first, each with its operations managers and A/E/F summary.
pub async fn list_services(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<ServiceListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(SERVICE.view)?;
    let services = ServiceRepo::list(&state.pool, &params).await?;
    let data = with_summaries(&state, services).await?;
    Ok(Json(DataResponse { data }))
}

#[derive(Debug, Deserialize)]
pub struct DefaultsParams {
    pub date: Option<Date>,
}

/// GET /api/v1/servicebook/services/defaults
///
/// Start and end for a new service on `date` (today when omitted), taken
/// from the configured service times.
pub async fn service_defaults(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<DefaultsParams>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[SERVICE.add, SERVICE.view])?;
    let start = parse_time(
        &PreferenceRepo::get(&state.pool, SERVICE_START_TIME).await?,
        SERVICE_START_TIME,
    );
    let end = parse_time(
        &PreferenceRepo::get(&state.pool, SERVICE_END_TIME).await?,
        SERVICE_END_TIME,
    );
    let (start, end) = service_window(params.date.unwrap_or_else(today), start, end);
    Ok(Json(DataResponse {
        data: ServiceDefaults { start, end },
    }))
}

/// POST /api/v1/servicebook/services
pub async fn create_service(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateService>,
) -> AppResult<impl IntoResponse> {
    principal.require(SERVICE.add)?;
    input.validate()?;
    validate_service_times(input.start_at, input.end_at)?;

    let service = ServiceRepo::create(&state.pool, &input).await?;
    tracing::info!(service_id = service.id, user_id = principal.user_id, "Service created");
    let data = service_response(&state, service).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// GET /api/v1/servicebook/services/{id}
pub async fn get_service(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(SERVICE.view)?;
    let service = ServiceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Service", id))?;
    let data = service_response(&state, service).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/servicebook/services/{id}
pub async fn update_service(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateService>,
) -> AppResult<impl IntoResponse> {
    principal.require(SERVICE.change)?;
    input.validate()?;
    let current = ServiceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Service", id))?;
    validate_service_times(
        input.start_at.unwrap_or(current.start_at),
        input.end_at.unwrap_or(current.end_at),
    )?;

    let service = ServiceRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Service", id))?;
    let data = service_response(&state, service).await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/servicebook/services/{id}
///
/// Removes the attendance list with it.
pub async fn delete_service(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(SERVICE.delete)?;
    if !ServiceRepo::delete(&state.pool, id).await? {
        return Err(not_found("Service", id));
    }
    tracing::info!(service_id = id, user_id = principal.user_id, "Service deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Attendance lists
// ---------------------------------------------------------------------------

/// GET /api/v1/servicebook/services/{id}/attendance
pub async fn list_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.view)?;
    ensure_service(&state, id).await?;
    Ok(Json(DataResponse {
        data: AttendanceRepo::list_for_service(&state.pool, id).await?,
    }))
}

/// PUT /api/v1/servicebook/services/{id}/attendance
///
/// Replaces the whole list: members missing from `entries` lose their entry.
pub async fn replace_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetAttendanceRequest>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.change)?;
    ensure_service(&state, id).await?;
    check_unique_members(&input.entries)?;

    let list = AttendanceRepo::replace_for_service(&state.pool, id, &input.entries).await?;
    tracing::info!(
        service_id = id,
        entries = list.len(),
        user_id = principal.user_id,
        "Attendance list replaced"
    );
    Ok(Json(DataResponse { data: list }))
}

/// POST /api/v1/servicebook/services/{id}/attendance
///
/// Records or changes a single member's state.
pub async fn set_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AttendanceEntry>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.add)?;
    ensure_service(&state, id).await?;
    ensure_member(&state, input.member_id).await?;
    let attendance =
        AttendanceRepo::set_state(&state.pool, id, input.member_id, input.state).await?;
    Ok(Json(DataResponse { data: attendance }))
}

/// PUT /api/v1/servicebook/attendance/{id}
pub async fn update_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAttendance>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.change)?;
    let current = AttendanceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Attendance", id))?;
    let attendance =
        AttendanceRepo::set_state(&state.pool, current.service_id, current.member_id, input.state)
            .await?;
    Ok(Json(DataResponse { data: attendance }))
}

/// DELETE /api/v1/servicebook/attendance/{id}
pub async fn delete_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ATTENDANCE.delete)?;
    if !AttendanceRepo::delete(&state.pool, id).await? {
        return Err(not_found("Attendance", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn check_unique_members(entries: &[AttendanceEntry]) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.member_id) {
            return Err(AppError::BadRequest(format!(
                "Member {} appears more than once",
                entry.member_id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Member attendance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MemberAttendance {
    pub member_id: DbId,
    pub counts: StateCounts,
    pub alert: AttendanceAlert,
    pub history: Vec<Attendance>,
}

/// Members may always read their own record.
async fn require_member_access(
    principal: &Principal,
    state: &AppState,
    member_id: DbId,
) -> AppResult<()> {
    if principal.member_id(state).await? == Some(member_id) {
        return Ok(());
    }
    principal.require(ATTENDANCE.view)
}

async fn member_alert(state: &AppState, member_id: DbId) -> AppResult<AttendanceAlert> {
    let threshold = PreferenceRepo::get_i64(&state.pool, MEMBERS_ALERT_THRESHOLD).await?;
    let window = PreferenceRepo::get_i64(&state.pool, MEMBERS_ALERT_LAST_ENTRIES).await?;
    let recent = AttendanceRepo::recent_states(&state.pool, member_id, window).await?;
    Ok(check_alert(&recent, threshold))
}

/// GET /api/v1/servicebook/members/{id}
///
/// History (newest first), per-state counts and the absence alert.
pub async fn member_attendance(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<HistoryParams>,
) -> AppResult<impl IntoResponse> {
    require_member_access(&principal, &state, id).await?;
    ensure_member(&state, id).await?;

    let counts = AttendanceRepo::member_counts(&state.pool, id).await?;
    let alert = member_alert(&state, id).await?;
    let history = AttendanceRepo::list_for_member(&state.pool, id, params.limit).await?;
    Ok(Json(DataResponse {
        data: MemberAttendance {
            member_id: id,
            counts,
            alert,
            history,
        },
    }))
}

/// GET /api/v1/servicebook/members/{id}/alert
pub async fn attendance_alert(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    require_member_access(&principal, &state, id).await?;
    ensure_member(&state, id).await?;
    let alert = member_alert(&state, id).await?;
    if alert.alert {
        tracing::debug!(member_id = id, absences = alert.absences, "Attendance alert raised");
    }
    Ok(Json(DataResponse { data: alert }))
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub state: Option<AttendanceState>,
    pub limit: Option<i64>,
}

/// GET /api/v1/servicebook/statistics/top
///
/// Members with the most entries of `state` (present by default).
pub async fn top_members(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<TopParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.view)?;
    let attendance_state = params.state.unwrap_or(AttendanceState::Present);
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    Ok(Json(DataResponse {
        data: AttendanceRepo::top_members(&state.pool, attendance_state, limit).await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SeriesParams {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

/// GET /api/v1/servicebook/statistics/series
pub async fn attendance_over_time(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<SeriesParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ATTENDANCE.view)?;
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if to < from {
            return Err(AppError::BadRequest("'to' must not be before 'from'".into()));
        }
    }
    let rows = AttendanceRepo::counts_per_service(&state.pool, params.from, params.to)
        .await?
        .into_iter()
        .map(|row| (row.start_at, row.counts()))
        .collect();
    Ok(Json(DataResponse {
        data: attendance_series(rows),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(member_id: DbId) -> AttendanceEntry {
        AttendanceEntry {
            member_id,
            state: AttendanceState::Present,
        }
    }

    #[test]
    fn duplicate_members_in_a_list_are_rejected() {
        assert!(check_unique_members(&[entry(1), entry(2)]).is_ok());
        assert!(check_unique_members(&[]).is_ok());
        assert!(check_unique_members(&[entry(1), entry(2), entry(1)]).is_err());
    }
}
