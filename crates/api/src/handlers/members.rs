//! Handlers for members, parents, member lookups and member events.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::validate_hex_color;
use clubhouse_core::permissions::{
    EVENT_TYPE, MEMBER, MEMBER_EVENT, MEMBER_GROUP, MEMBER_STATUS, PARENT,
};
use clubhouse_core::types::DbId;
use clubhouse_db::models::member::{
    CreateMember, CreateMemberEvent, CreateMemberStatus, CreateParent, MemberListParams,
    MemberResponse, NamePayload, ParentResponse, UpdateMember, UpdateMemberEvent,
    UpdateMemberStatus, UpdateParent,
};
use clubhouse_db::repositories::{
    EventTypeRepo, MemberEventRepo, MemberGroupRepo, MemberRepo, MemberStatusRepo, ParentRepo,
};
use validator::Validate;

use super::today;
use crate::error::{not_found, AppResult};
use crate::middleware::permissions::Principal;
use crate::query::SearchParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// GET /api/v1/members
pub async fn list_members(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<MemberListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER.view)?;
    let today = today();
    let members: Vec<MemberResponse> = MemberRepo::list(&state.pool, &params)
        .await?
        .into_iter()
        .map(|m| MemberResponse::new(m, today))
        .collect();
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/members
pub async fn create_member(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateMember>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER.add)?;
    input.validate()?;
    let member = MemberRepo::create(&state.pool, &input).await?;
    tracing::info!(member_id = member.id, user_id = principal.user_id, "Member created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MemberResponse::new(member, today()),
        }),
    ))
}

/// GET /api/v1/members/statistics
pub async fn member_statistics(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER.view)?;
    let stats = MemberRepo::statistics(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/members/{id}
pub async fn get_member(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER.view)?;
    let member = MemberRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Member", id))?;
    Ok(Json(DataResponse {
        data: MemberResponse::new(member, today()),
    }))
}

/// PUT /api/v1/members/{id}
pub async fn update_member(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMember>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER.change)?;
    input.validate()?;
    let member = MemberRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Member", id))?;
    tracing::info!(member_id = id, user_id = principal.user_id, "Member updated");
    Ok(Json(DataResponse {
        data: MemberResponse::new(member, today()),
    }))
}

/// DELETE /api/v1/members/{id}
pub async fn delete_member(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(MEMBER.delete)?;
    if !MemberRepo::delete(&state.pool, id).await? {
        return Err(not_found("Member", id));
    }
    tracing::info!(member_id = id, user_id = principal.user_id, "Member deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/members/{id}/parents
pub async fn member_parents(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(PARENT.view)?;
    MemberRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Member", id))?;

    let mut data = Vec::new();
    for parent in ParentRepo::list_for_member(&state.pool, id).await? {
        let children = ParentRepo::children_ids(&state.pool, parent.id).await?;
        data.push(ParentResponse::new(parent, children));
    }
    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Member events
// ---------------------------------------------------------------------------

/// GET /api/v1/members/{id}/events
///
/// Newest first.
pub async fn list_member_events(
    principal: Principal,
    State(state): State<AppState>,
    Path(member_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_EVENT.view)?;
    MemberRepo::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| not_found("Member", member_id))?;
    let events = MemberEventRepo::list_for_member(&state.pool, member_id).await?;
    Ok(Json(DataResponse { data: events }))
}

/// POST /api/v1/members/{id}/events
pub async fn create_member_event(
    principal: Principal,
    State(state): State<AppState>,
    Path(member_id): Path<DbId>,
    Json(input): Json<CreateMemberEvent>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_EVENT.add)?;
    MemberRepo::find_by_id(&state.pool, member_id)
        .await?
        .ok_or_else(|| not_found("Member", member_id))?;
    let event = MemberEventRepo::create(&state.pool, member_id, &input).await?;
    tracing::info!(event_id = event.id, member_id, "Member event created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// PUT /api/v1/member-events/{id}
pub async fn update_member_event(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMemberEvent>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_EVENT.change)?;
    let event = MemberEventRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("MemberEvent", id))?;
    Ok(Json(DataResponse { data: event }))
}

/// DELETE /api/v1/member-events/{id}
pub async fn delete_member_event(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(MEMBER_EVENT.delete)?;
    if !MemberEventRepo::delete(&state.pool, id).await? {
        return Err(not_found("MemberEvent", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Parents
// ---------------------------------------------------------------------------

/// GET /api/v1/parents
pub async fn list_parents(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(PARENT.view)?;
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let mut data = Vec::new();
    for parent in ParentRepo::list(&state.pool, search).await? {
        let children = ParentRepo::children_ids(&state.pool, parent.id).await?;
        data.push(ParentResponse::new(parent, children));
    }
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/parents
pub async fn create_parent(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateParent>,
) -> AppResult<impl IntoResponse> {
    principal.require(PARENT.add)?;
    input.validate()?;
    let parent = ParentRepo::create(&state.pool, &input).await?;
    let children = ParentRepo::children_ids(&state.pool, parent.id).await?;
    tracing::info!(parent_id = parent.id, children = children.len(), "Parent created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ParentResponse::new(parent, children),
        }),
    ))
}

/// GET /api/v1/parents/{id}
pub async fn get_parent(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(PARENT.view)?;
    let parent = ParentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Parent", id))?;
    let children = ParentRepo::children_ids(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ParentResponse::new(parent, children),
    }))
}

/// PUT /api/v1/parents/{id}
pub async fn update_parent(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateParent>,
) -> AppResult<impl IntoResponse> {
    principal.require(PARENT.change)?;
    input.validate()?;
    let parent = ParentRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Parent", id))?;
    let children = ParentRepo::children_ids(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ParentResponse::new(parent, children),
    }))
}

/// DELETE /api/v1/parents/{id}
pub async fn delete_parent(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(PARENT.delete)?;
    if !ParentRepo::delete(&state.pool, id).await? {
        return Err(not_found("Parent", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// GET /api/v1/member-statuses
pub async fn list_statuses(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_STATUS.view)?;
    let statuses = MemberStatusRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: statuses }))
}

/// POST /api/v1/member-statuses
pub async fn create_status(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateMemberStatus>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_STATUS.add)?;
    input.validate()?;
    if let Some(color) = &input.color {
        validate_hex_color(color)?;
    }
    let status = MemberStatusRepo::create(&state.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: status })))
}

/// PUT /api/v1/member-statuses/{id}
pub async fn update_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMemberStatus>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_STATUS.change)?;
    input.validate()?;
    if let Some(color) = &input.color {
        validate_hex_color(color)?;
    }
    let status = MemberStatusRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("MemberStatus", id))?;
    Ok(Json(DataResponse { data: status }))
}

/// DELETE /api/v1/member-statuses/{id}
pub async fn delete_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(MEMBER_STATUS.delete)?;
    if !MemberStatusRepo::delete(&state.pool, id).await? {
        return Err(not_found("MemberStatus", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Groups and event types
// ---------------------------------------------------------------------------

/// GET /api/v1/member-groups
pub async fn list_groups(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_GROUP.view)?;
    Ok(Json(DataResponse {
        data: MemberGroupRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/member-groups
pub async fn create_group(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<NamePayload>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_GROUP.add)?;
    input.validate()?;
    let group = MemberGroupRepo::create(&state.pool, input.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// PUT /api/v1/member-groups/{id}
pub async fn rename_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<NamePayload>,
) -> AppResult<impl IntoResponse> {
    principal.require(MEMBER_GROUP.change)?;
    input.validate()?;
    let group = MemberGroupRepo::rename(&state.pool, id, input.name.trim())
        .await?
        .ok_or_else(|| not_found("MemberGroup", id))?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/member-groups/{id}
pub async fn delete_group(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(MEMBER_GROUP.delete)?;
    if !MemberGroupRepo::delete(&state.pool, id).await? {
        return Err(not_found("MemberGroup", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/event-types
pub async fn list_event_types(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(EVENT_TYPE.view)?;
    Ok(Json(DataResponse {
        data: EventTypeRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/event-types
pub async fn create_event_type(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<NamePayload>,
) -> AppResult<impl IntoResponse> {
    principal.require(EVENT_TYPE.add)?;
    input.validate()?;
    let event_type = EventTypeRepo::create(&state.pool, input.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event_type })))
}

/// PUT /api/v1/event-types/{id}
pub async fn rename_event_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<NamePayload>,
) -> AppResult<impl IntoResponse> {
    principal.require(EVENT_TYPE.change)?;
    input.validate()?;
    let event_type = EventTypeRepo::rename(&state.pool, id, input.name.trim())
        .await?
        .ok_or_else(|| not_found("EventType", id))?;
    Ok(Json(DataResponse { data: event_type }))
}

/// DELETE /api/v1/event-types/{id}
pub async fn delete_event_type(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(EVENT_TYPE.delete)?;
    if !EventTypeRepo::delete(&state.pool, id).await? {
        return Err(not_found("EventType", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
