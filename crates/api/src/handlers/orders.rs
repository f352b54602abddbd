//! Handlers for equipment orders: the orderable catalog, statuses, orders,
//! order items and their status workflow.
//!
//! Notifications are dispatched after the owning database transaction has
//! committed. Their outcome is reported alongside the result but never turns
//! a successful change into an error.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::{validate_hex_color, CoreError};
use clubhouse_core::orders::{status_statistics, validate_size, workflow_description};
use clubhouse_core::permissions::{
    CHANGE_ORDER_STATUS, MANAGE_ORDERS, ORDER, ORDERABLE_ITEM, ORDER_STATUS,
};
use clubhouse_core::types::DbId;
use clubhouse_db::models::order::{
    BulkStatusRequest, BulkStatusResult, ChangeStatusRequest, CreateOrder, CreateOrderStatus,
    CreateOrderableItem, OrderItem, OrderItemListParams, OrderListParams, OrderStatus,
    OrderableItemResponse, ReminderRequest, SummaryRequest, UpdateOrder, UpdateOrderItem,
    UpdateOrderStatus, UpdateOrderableItem,
};
use clubhouse_db::repositories::{
    MemberRepo, OrderItemRepo, OrderRepo, OrderStatusRepo, OrderableItemRepo,
};
use clubhouse_events::notifications::DEFAULT_REMINDER_DAYS;
use clubhouse_events::DispatchReport;
use serde::Serialize;
use validator::Validate;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::permissions::Principal;
use crate::query::ActiveOnlyParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of a single status change.
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub item: OrderItem,
    pub from_status: String,
    pub notification: DispatchReport,
}

#[derive(Debug, Serialize)]
pub struct BulkStatusResponse {
    #[serde(flatten)]
    pub result: BulkStatusResult,
    pub notification: DispatchReport,
}

async fn target_status(state: &AppState, code: &str) -> AppResult<OrderStatus> {
    OrderStatusRepo::find_by_code(&state.pool, code.trim())
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "Unknown or inactive status '{code}'"
            )))
        })
}

// ---------------------------------------------------------------------------
// Orderable items
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/catalog
pub async fn list_orderable_items(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<ActiveOnlyParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDERABLE_ITEM.view)?;
    let items: Vec<OrderableItemResponse> =
        OrderableItemRepo::list(&state.pool, params.active_only)
            .await?
            .into_iter()
            .map(OrderableItemResponse::from)
            .collect();
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/orders/catalog
pub async fn create_orderable_item(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateOrderableItem>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDERABLE_ITEM.add)?;
    input.validate()?;
    let item = OrderableItemRepo::create(&state.pool, &input).await?;
    tracing::info!(orderable_item_id = item.id, "Orderable item created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: OrderableItemResponse::from(item),
        }),
    ))
}

/// GET /api/v1/orders/catalog/{id}
pub async fn get_orderable_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDERABLE_ITEM.view)?;
    let item = OrderableItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("OrderableItem", id))?;
    Ok(Json(DataResponse {
        data: OrderableItemResponse::from(item),
    }))
}

/// PUT /api/v1/orders/catalog/{id}
pub async fn update_orderable_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderableItem>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDERABLE_ITEM.change)?;
    input.validate()?;
    let item = OrderableItemRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("OrderableItem", id))?;
    Ok(Json(DataResponse {
        data: OrderableItemResponse::from(item),
    }))
}

/// DELETE /api/v1/orders/catalog/{id}
pub async fn delete_orderable_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ORDERABLE_ITEM.delete)?;
    if !OrderableItemRepo::delete(&state.pool, id).await? {
        return Err(not_found("OrderableItem", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/statuses
pub async fn list_statuses(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER_STATUS.view)?;
    Ok(Json(DataResponse {
        data: OrderStatusRepo::list(&state.pool).await?,
    }))
}

/// POST /api/v1/orders/statuses
pub async fn create_status(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateOrderStatus>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER_STATUS.add)?;
    input.validate()?;
    if let Some(color) = &input.color {
        validate_hex_color(color)?;
    }
    let status = OrderStatusRepo::create(&state.pool, &input).await?;
    tracing::info!(status_id = status.id, code = %status.code, "Order status created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: status })))
}

/// PUT /api/v1/orders/statuses/{id}
pub async fn update_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderStatus>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER_STATUS.change)?;
    input.validate()?;
    if let Some(color) = &input.color {
        validate_hex_color(color)?;
    }
    let status = OrderStatusRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("OrderStatus", id))?;
    Ok(Json(DataResponse { data: status }))
}

/// DELETE /api/v1/orders/statuses/{id}
pub async fn delete_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ORDER_STATUS.delete)?;
    if !OrderStatusRepo::delete(&state.pool, id).await? {
        return Err(not_found("OrderStatus", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// GET /api/v1/orders
pub async fn list_orders(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    Ok(Json(DataResponse {
        data: OrderRepo::list(&state.pool, &params).await?,
    }))
}

/// POST /api/v1/orders
///
/// Every item starts in `pending`. Items must be active catalog entries and
/// carry a listed size where the entry has sizes.
pub async fn create_order(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateOrder>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.add)?;
    input.validate()?;

    MemberRepo::find_by_id(&state.pool, input.member_id)
        .await?
        .ok_or_else(|| not_found("Member", input.member_id))?;

    let ids: Vec<DbId> = input.items.iter().map(|i| i.item_id).collect();
    let catalog = OrderableItemRepo::find_many(&state.pool, &ids).await?;
    for line in &input.items {
        let entry = catalog
            .iter()
            .find(|c| c.id == line.item_id)
            .ok_or_else(|| not_found("OrderableItem", line.item_id))?;
        if !entry.is_active {
            return Err(AppError::Core(CoreError::Validation(format!(
                "'{}' can no longer be ordered",
                entry.name
            ))));
        }
        validate_size(entry.has_sizes, &entry.available_sizes, line.size.as_deref())?;
    }

    let order = OrderRepo::create(&state.pool, &input, Some(principal.user_id)).await?;
    tracing::info!(
        order_id = order.order.id,
        member_id = order.order.member_id,
        items = order.items.len(),
        user_id = principal.user_id,
        "Order created"
    );

    state.notifications.order_created(order.order.id).await;
    Ok((StatusCode::CREATED, Json(DataResponse { data: order })))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    let order = OrderRepo::find_with_items(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Order", id))?;
    Ok(Json(DataResponse { data: order }))
}

/// PUT /api/v1/orders/{id}
pub async fn update_order(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrder>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.change)?;
    let order = OrderRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Order", id))?;
    Ok(Json(DataResponse { data: order }))
}

/// DELETE /api/v1/orders/{id}
pub async fn delete_order(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ORDER.delete)?;
    if !OrderRepo::delete(&state.pool, id).await? {
        return Err(not_found("Order", id));
    }
    tracing::info!(order_id = id, user_id = principal.user_id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Order items
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/items
pub async fn list_order_items(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<OrderItemListParams>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    Ok(Json(DataResponse {
        data: OrderItemRepo::list(&state.pool, &params).await?,
    }))
}

/// GET /api/v1/orders/items/{id}
pub async fn get_order_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    let item = OrderItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("OrderItem", id))?;
    Ok(Json(DataResponse { data: item }))
}

/// PUT /api/v1/orders/items/{id}
///
/// Size, quantity and notes only; the status moves through `/status`.
pub async fn update_order_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderItem>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.change)?;
    input.validate()?;

    let current = OrderItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("OrderItem", id))?;
    if input.size.is_some() {
        let entry = OrderableItemRepo::find_by_id(&state.pool, current.item_id)
            .await?
            .ok_or_else(|| not_found("OrderableItem", current.item_id))?;
        validate_size(entry.has_sizes, &entry.available_sizes, input.size.as_deref())?;
    }

    let item = OrderItemRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("OrderItem", id))?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/orders/items/{id}
pub async fn delete_order_item(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    principal.require(ORDER.delete)?;
    if !OrderItemRepo::delete(&state.pool, id).await? {
        return Err(not_found("OrderItem", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/orders/items/{id}/status
pub async fn change_item_status(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ChangeStatusRequest>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[CHANGE_ORDER_STATUS, MANAGE_ORDERS])?;
    let target = target_status(&state, &input.status).await?;
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let change = OrderItemRepo::change_status(
        &state.pool,
        id,
        &target,
        Some(principal.user_id),
        notes,
    )
    .await?
    .ok_or_else(|| not_found("OrderItem", id))?;

    tracing::info!(
        order_item_id = id,
        from = %change.from_code,
        to = %target.code,
        user_id = principal.user_id,
        "Order item status changed"
    );

    let notification = state
        .notifications
        .status_update(&change, Some(&principal.name), notes)
        .await;
    Ok(Json(DataResponse {
        data: StatusChangeResponse {
            from_status: change.from_code,
            item: change.item,
            notification,
        },
    }))
}

/// POST /api/v1/orders/items/bulk-status
///
/// Applies the change to every item whose transition is allowed and reports
/// the rest as blocked.
pub async fn bulk_update_status(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<BulkStatusRequest>,
) -> AppResult<impl IntoResponse> {
    principal.require_any(&[CHANGE_ORDER_STATUS, MANAGE_ORDERS])?;
    input.validate()?;
    let target = target_status(&state, &input.status).await?;
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let (validation, updated) = OrderItemRepo::bulk_change_status(
        &state.pool,
        &input.item_ids,
        &target,
        Some(principal.user_id),
        notes,
    )
    .await?;

    tracing::info!(
        to = %target.code,
        allowed = validation.allowed.len(),
        blocked = validation.blocked.len(),
        errors = validation.errors.len(),
        user_id = principal.user_id,
        "Bulk status update"
    );

    let notification = if updated.is_empty() {
        DispatchReport::default()
    } else {
        state
            .notifications
            .bulk_update(&updated, &target, Some(&principal.name))
            .await
    };
    Ok(Json(DataResponse {
        data: BulkStatusResponse {
            result: BulkStatusResult {
                validation,
                updated,
            },
            notification,
        },
    }))
}

/// GET /api/v1/orders/items/{id}/history
pub async fn item_history(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    OrderItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("OrderItem", id))?;
    Ok(Json(DataResponse {
        data: OrderItemRepo::history(&state.pool, id).await?,
    }))
}

// ---------------------------------------------------------------------------
// Reporting and reminders
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/statistics
pub async fn statistics(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    principal.require(ORDER.view)?;
    let rows = OrderItemRepo::status_quantities(&state.pool).await?;
    let stats = status_statistics(rows.iter().map(|r| (r.code.as_str(), r.quantity)));
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/orders/workflow
pub async fn workflow(_principal: Principal) -> AppResult<impl IntoResponse> {
    Ok(Json(DataResponse {
        data: workflow_description(),
    }))
}

/// POST /api/v1/orders/reminders
pub async fn send_reminders(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<ReminderRequest>,
) -> AppResult<impl IntoResponse> {
    principal.require(MANAGE_ORDERS)?;
    let days = input.days.unwrap_or(DEFAULT_REMINDER_DAYS);
    if days < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "days must not be negative".into(),
        )));
    }
    let report = state.notifications.pending_reminders(days).await?;
    tracing::info!(days, orders = report.orders, "Pending reminders sent");
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/orders/summary
pub async fn send_summary(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<SummaryRequest>,
) -> AppResult<impl IntoResponse> {
    principal.require(MANAGE_ORDERS)?;
    input.validate()?;
    let statuses = input.statuses.unwrap_or_default();
    let report = state
        .notifications
        .order_summary(input.recipient.as_deref(), &statuses)
        .await?;
    Ok(Json(DataResponse { data: report }))
}
