//! Handlers for qualification types, qualifications, special task types,
//! special tasks and the qualification dashboard.
//!
//! Callers without a view-all permission only see records held by
//! themselves, either as user or through their linked member record.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::person::PersonRef;
use clubhouse_core::permissions::{
    MANAGE_QUALIFICATIONS, MANAGE_SPECIAL_TASKS, QUALIFICATION, QUALIFICATION_TYPE, SPECIAL_TASK,
    SPECIAL_TASK_TYPE, VIEW_ALL_QUALIFICATIONS, VIEW_ALL_SPECIAL_TASKS,
};
use clubhouse_core::qualifications::{resolve_expiry, validate_task_dates, validate_type};
use clubhouse_core::types::DbId;
use clubhouse_db::models::qualification::{
    CreateQualification, CreateQualificationType, CreateSpecialTask, CreateSpecialTaskType,
    NewQualification, QualificationDashboard, QualificationListParams, QualificationResponse,
    SpecialTaskListParams, SpecialTaskResponse, UpdateQualification, UpdateQualificationType,
    UpdateSpecialTask, UpdateSpecialTaskType,
};
use clubhouse_db::repositories::{
    OwnerScope, QualificationRepo, QualificationTypeRepo, SpecialTaskRepo, SpecialTaskTypeRepo,
};
use validator::Validate;

use super::today;
use crate::error::{not_found, AppResult};
use crate::middleware::permissions::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

const DASHBOARD_RECENT: i64 = 5;
const DASHBOARD_EXPIRING: i64 = 10;
const DASHBOARD_CURRENT_TASKS: i64 = 10;

/// `None` when the caller may see every record.
async fn scope_for(
    principal: &Principal,
    state: &AppState,
    view_all: &[&str],
) -> AppResult<Option<OwnerScope>> {
    if principal.has_any(view_all) {
        return Ok(None);
    }
    Ok(Some(OwnerScope {
        user_id: principal.user_id,
        member_id: principal.member_id(state).await?,
    }))
}

fn owned_by(scope: Option<OwnerScope>, user_id: Option<DbId>, member_id: Option<DbId>) -> bool {
    match scope {
        None => true,
        Some(scope) => {
            user_id == Some(scope.user_id)
                || (scope.member_id.is_some() && member_id == scope.member_id)
        }
    }
}

async fn qualification_scope(
    principal: &Principal,
    state: &AppState,
) -> AppResult<Option<OwnerScope>> {
    scope_for(principal, state, &[VIEW_ALL_QUALIFICATIONS, QUALIFICATION.view]).await
}

async fn task_scope(principal: &Principal, state: &AppState) -> AppResult<Option<OwnerScope>> {
    scope_for(principal, state, &[VIEW_ALL_SPECIAL_TASKS, SPECIAL_TASK.view]).await
}

// ---------------------------------------------------------------------------
// Qualification types
// ---------------------------------------------------------------------------

/// GET /api/v1/qualifications/types
///
/// Readable by every authenticated user.
pub async fn list_types(
    _principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: QualificationTypeRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/qualifications/types
pub async fn create_type(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateQualificationType>,
) -> AppResult<impl IntoResponse> {
    principal.require(QUALIFICATION_TYPE.add)?;
    input.validate()?;
    validate_type(input.expires, input.validity_period)?;
    let qualification_type = QualificationTypeRepo::create(&state.pool, &input).await?;
    tracing::info!(type_id = qualification_type.id, "Qualification type created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: qualification_type,
        }),
    ))
}

/// PUT /api/v1/qualifications/types/{id}
///
/// Switching `expires` off clears the validity period unless one is sent,
/// in which case validation rejects the combination.
pub async fn update_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateQualificationType>,
) -> AppResult<impl IntoResponse> {
    principal.require(QUALIFICATION_TYPE.change)?;
    input.validate()?;
    let current = QualificationTypeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("QualificationType", id))?;

    let expires = input.expires.unwrap_or(current.expires);
    let validity_period = match (input.validity_period, expires) {
        (Some(months), _) => Some(months),
        (None, true) => current.validity_period,
        (None, false) => None,
    };
    validate_type(expires, validity_period)?;

    let qualification_type =
        QualificationTypeRepo::update(&state.pool, id, &input, expires, validity_period)
            .await?
            .ok_or_else(|| not_found("QualificationType", id))?;
    Ok(Json(DataResponse {
        data: qualification_type,
    }))
}

/// DELETE /api/v1/qualifications/types/{id}
pub async fn delete_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(QUALIFICATION_TYPE.delete)?;
    if !QualificationTypeRepo::delete(&state.pool, id).await? {
        return Err(not_found("QualificationType", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Qualifications
// ---------------------------------------------------------------------------

/// GET /api/v1/qualifications
pub async fn list_qualifications(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<QualificationListParams>,
) -> AppResult<impl IntoResponse> {
    let scope = qualification_scope(&principal, &state).await?;
    let today = today();
    let data: Vec<QualificationResponse> =
        QualificationRepo::list(&state.pool, &params, scope, today)
            .await?
            .into_iter()
            .map(|q| QualificationResponse::new(q, today))
            .collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/qualifications
///
/// Exactly one of `user_id` / `member_id`. For expiring types the expiry
/// date defaults to acquisition plus the validity period.
pub async fn create_qualification(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateQualification>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[QUALIFICATION.add, MANAGE_QUALIFICATIONS])?;
    let person = PersonRef::from_ids(input.user_id, input.member_id)?;
    let qualification_type =
        QualificationTypeRepo::find_by_id(&state.pool, input.qualification_type_id)
            .await?
            .ok_or_else(|| not_found("QualificationType", input.qualification_type_id))?;

    let date_expires = resolve_expiry(
        input.date_acquired,
        input.date_expires,
        qualification_type.expires,
        qualification_type.validity_period,
    )?;

    let qualification = QualificationRepo::create(
        &state.pool,
        &NewQualification {
            qualification_type_id: qualification_type.id,
            user_id: person.user_id(),
            member_id: person.member_id(),
            date_acquired: input.date_acquired,
            date_expires,
            issued_by: input.issued_by,
            note: input.note,
        },
    )
    .await?;

    tracing::info!(
        qualification_id = qualification.id,
        type_id = qualification_type.id,
        user_id = principal.user_id,
        "Qualification recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: QualificationResponse::new(qualification, today()),
        }),
    ))
}

/// GET /api/v1/qualifications/{id}
pub async fn get_qualification(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let scope = qualification_scope(&principal, &state).await?;
    let qualification = QualificationRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|q| owned_by(scope, q.user_id, q.member_id))
        .ok_or_else(|| not_found("Qualification", id))?;
    Ok(Json(DataResponse {
        data: QualificationResponse::new(qualification, today()),
    }))
}

/// PUT /api/v1/qualifications/{id}
///
/// The holder cannot be changed. A new acquisition date without an explicit
/// expiry date recomputes the expiry for expiring types.
pub async fn update_qualification(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateQualification>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[QUALIFICATION.change, MANAGE_QUALIFICATIONS])?;
    let current = QualificationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Qualification", id))?;
    let qualification_type =
        QualificationTypeRepo::find_by_id(&state.pool, current.qualification_type_id)
            .await?
            .ok_or_else(|| not_found("QualificationType", current.qualification_type_id))?;

    let acquired = input.date_acquired.unwrap_or(current.date_acquired);
    let explicit = match (input.date_expires, input.date_acquired) {
        (Some(date), _) => Some(date),
        (None, Some(_)) => None,
        (None, None) => current.date_expires,
    };
    let date_expires = resolve_expiry(
        acquired,
        explicit,
        qualification_type.expires,
        qualification_type.validity_period,
    )?;

    let update = UpdateQualification {
        date_acquired: Some(acquired),
        date_expires,
        ..input
    };
    let qualification = QualificationRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| not_found("Qualification", id))?;
    Ok(Json(DataResponse {
        data: QualificationResponse::new(qualification, today()),
    }))
}

/// DELETE /api/v1/qualifications/{id}
pub async fn delete_qualification(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require_any(&[QUALIFICATION.delete, MANAGE_QUALIFICATIONS])?;
    if !QualificationRepo::delete(&state.pool, id).await? {
        return Err(not_found("Qualification", id));
    }
    tracing::info!(qualification_id = id, user_id = principal.user_id, "Qualification deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Special task types
// ---------------------------------------------------------------------------

/// GET /api/v1/special-tasks/types
pub async fn list_task_types(
    _principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: SpecialTaskTypeRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/special-tasks/types
pub async fn create_task_type(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateSpecialTaskType>,
) -> AppResult<impl IntoResponse> {
    principal.require(SPECIAL_TASK_TYPE.add)?;
    input.validate()?;
    let task_type = SpecialTaskTypeRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task_type })))
}

/// PUT /api/v1/special-tasks/types/{id}
pub async fn update_task_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSpecialTaskType>,
) -> AppResult<impl IntoResponse> {
    principal.require(SPECIAL_TASK_TYPE.change)?;
    input.validate()?;
    let task_type = SpecialTaskTypeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("SpecialTaskType", id))?;
    Ok(Json(DataResponse { data: task_type }))
}

/// DELETE /api/v1/special-tasks/types/{id}
pub async fn delete_task_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(SPECIAL_TASK_TYPE.delete)?;
    if !SpecialTaskTypeRepo::delete(&state.pool, id).await? {
        return Err(not_found("SpecialTaskType", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Special tasks
// ---------------------------------------------------------------------------

/// GET /api/v1/special-tasks
pub async fn list_tasks(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<SpecialTaskListParams>,
) -> AppResult<impl IntoResponse> {
    let scope = task_scope(&principal, &state).await?;
    let today = today();
    let data: Vec<SpecialTaskResponse> = SpecialTaskRepo::list(&state.pool, &params, scope, today)
        .await?
        .into_iter()
        .map(|t| SpecialTaskResponse::new(t, today))
        .collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/special-tasks
pub async fn create_task(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateSpecialTask>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[SPECIAL_TASK.add, MANAGE_SPECIAL_TASKS])?;
    PersonRef::from_ids(input.user_id, input.member_id)?;
    validate_task_dates(input.start_date, input.end_date)?;

    let task = SpecialTaskRepo::create(&state.pool, &input).await?;
    tracing::info!(task_id = task.id, user_id = principal.user_id, "Special task assigned");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SpecialTaskResponse::new(task, today()),
        }),
    ))
}

/// GET /api/v1/special-tasks/{id}
pub async fn get_task(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let scope = task_scope(&principal, &state).await?;
    let task = SpecialTaskRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|t| owned_by(scope, t.user_id, t.member_id))
        .ok_or_else(|| not_found("SpecialTask", id))?;
    Ok(Json(DataResponse {
        data: SpecialTaskResponse::new(task, today()),
    }))
}

/// PUT /api/v1/special-tasks/{id}
pub async fn update_task(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSpecialTask>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[SPECIAL_TASK.change, MANAGE_SPECIAL_TASKS])?;
    let current = SpecialTaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("SpecialTask", id))?;
    validate_task_dates(
        input.start_date.unwrap_or(current.start_date),
        input.end_date.or(current.end_date),
    )?;

    let task = SpecialTaskRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("SpecialTask", id))?;
    Ok(Json(DataResponse {
        data: SpecialTaskResponse::new(task, today()),
    }))
}

/// DELETE /api/v1/special-tasks/{id}
pub async fn delete_task(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require_any(&[SPECIAL_TASK.delete, MANAGE_SPECIAL_TASKS])?;
    if !SpecialTaskRepo::delete(&state.pool, id).await? {
        return Err(not_found("SpecialTask", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// GET /api/v1/qualifications/dashboard
///
/// Counts and lists honor the caller's visibility.
pub async fn dashboard(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let scope = qualification_scope(&principal, &state).await?;
    let tasks = task_scope(&principal, &state).await?;
    let today = today();

    let counts = QualificationRepo::counts(&state.pool, scope, today).await?;
    let recent_qualifications = QualificationRepo::recent(&state.pool, scope, DASHBOARD_RECENT)
        .await?
        .into_iter()
        .map(|q| QualificationResponse::new(q, today))
        .collect();
    let expiring_soon = QualificationRepo::expiring(&state.pool, scope, today, DASHBOARD_EXPIRING)
        .await?
        .into_iter()
        .map(|q| QualificationResponse::new(q, today))
        .collect();
    let current_tasks = SpecialTaskRepo::current(&state.pool, tasks, today, DASHBOARD_CURRENT_TASKS)
        .await?
        .into_iter()
        .map(|t| SpecialTaskResponse::new(t, today))
        .collect();

    Ok(Json(DataResponse {
        data: QualificationDashboard {
            counts,
            recent_qualifications,
            expiring_soon,
            current_tasks,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_sees_everything() {
        assert!(owned_by(None, None, Some(4)));
    }

    #[test]
    fn scope_matches_user_or_linked_member() {
        let scope = Some(OwnerScope {
            user_id: 1,
            member_id: Some(9),
        });
        assert!(owned_by(scope, Some(1), None));
        assert!(owned_by(scope, None, Some(9)));
        assert!(!owned_by(scope, Some(2), None));
        assert!(!owned_by(scope, None, Some(8)));
    }

    #[test]
    fn scope_without_member_ignores_member_records() {
        let scope = Some(OwnerScope {
            user_id: 1,
            member_id: None,
        });
        assert!(!owned_by(scope, None, None));
        assert!(!owned_by(scope, None, Some(3)));
    }
}
