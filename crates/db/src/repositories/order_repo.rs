//! Repositories for `orders`, `order_items` and the status history.

use std::collections::HashMap;

use clubhouse_core::orders::{
    date_stamps, default_history_note, validate_bulk, validate_transition, BulkValidation,
    INITIAL_STATUS,
};
use clubhouse_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::order::{
    CreateOrder, Order, OrderItem, OrderItemListParams, OrderItemStatusHistory, OrderListParams,
    OrderStatus, OrderWithItems, ShoppingListRow, StatusChange, StatusQuantity, UpdateOrder,
    UpdateOrderItem,
};
use crate::{clamp_limit, clamp_offset, RepoError};

const ORDER_SELECT: &str = "SELECT o.id, o.member_id, \
    TRIM(m.name || ' ' || m.lastname) AS member_name, m.email AS member_email, \
    o.ordered_by_id, \
    COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS ordered_by_name, \
    o.order_date, o.notes, o.created_at, o.updated_at \
    FROM orders o \
    JOIN members m ON m.id = o.member_id \
    LEFT JOIN users u ON u.id = o.ordered_by_id";

const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.item_id, it.name AS item_name, \
    oi.size, oi.quantity, oi.status_id, s.code AS status_code, s.name AS status_name, \
    s.color AS status_color, oi.received_date, oi.delivered_date, oi.notes, \
    oi.created_at, oi.updated_at \
    FROM order_items oi \
    JOIN orderable_items it ON it.id = oi.item_id \
    JOIN order_statuses s ON s.id = oi.status_id";

pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order and its items, all starting in the initial status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrder,
        ordered_by_id: Option<DbId>,
    ) -> Result<OrderWithItems, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let (order_id,): (DbId,) = sqlx::query_as(
            "INSERT INTO orders (member_id, ordered_by_id, notes) VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(input.member_id)
        .bind(ordered_by_id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let (status_id,): (DbId,) = sqlx::query_as("SELECT id FROM order_statuses WHERE code = $1")
            .bind(INITIAL_STATUS)
            .fetch_one(&mut *tx)
            .await?;

        for item in &input.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, item_id, size, quantity, status_id, notes)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order_id)
            .bind(item.item_id)
            .bind(item.size.as_deref().filter(|s| !s.is_empty()))
            .bind(item.quantity.unwrap_or(1))
            .bind(status_id)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Self::find_with_items(pool, order_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("{ORDER_SELECT} WHERE o.id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_items(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<OrderWithItems>, sqlx::Error> {
        let Some(order) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let items = OrderItemRepo::list_for_order(pool, id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Orders, newest first. A `status` filter keeps orders with at least one
    /// item in that status.
    pub async fn list(
        pool: &PgPool,
        params: &OrderListParams,
    ) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let query = format!(
            "{ORDER_SELECT}
             WHERE ($1::BIGINT IS NULL OR o.member_id = $1)
               AND ($2::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM order_items oi
                    JOIN order_statuses s ON s.id = oi.status_id
                    WHERE oi.order_id = o.id AND s.code = $2))
             ORDER BY o.order_date DESC, o.id DESC
             LIMIT $3 OFFSET $4"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(params.member_id)
            .bind(&params.status)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await?;
        Self::attach_items(pool, orders).await
    }

    /// Orders older than `days` days that still have items in one of `codes`,
    /// each with only those items attached.
    pub async fn list_with_items_in_status(
        pool: &PgPool,
        codes: &[&str],
        older_than_days: i64,
    ) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        let query = format!(
            "{ORDER_SELECT}
             WHERE o.order_date < NOW() - make_interval(days => $2::INT)
               AND EXISTS (
                    SELECT 1 FROM order_items oi
                    JOIN order_statuses s ON s.id = oi.status_id
                    WHERE oi.order_id = o.id AND s.code = ANY($1) AND s.is_active = true)
             ORDER BY o.order_date, o.id"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(&codes)
            .bind(older_than_days as i32)
            .fetch_all(pool)
            .await?;
        let mut result = Self::attach_items(pool, orders).await?;
        for order in &mut result {
            order
                .items
                .retain(|item| codes.iter().any(|c| c == &item.status_code));
        }
        Ok(result)
    }

    async fn attach_items(
        pool: &PgPool,
        orders: Vec<Order>,
    ) -> Result<Vec<OrderWithItems>, sqlx::Error> {
        let ids: Vec<DbId> = orders.iter().map(|o| o.id).collect();
        let mut by_order: HashMap<DbId, Vec<OrderItem>> = HashMap::new();
        for item in OrderItemRepo::list_for_orders(pool, &ids).await? {
            by_order.entry(item.order_id).or_default().push(item);
        }
        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOrder,
    ) -> Result<Option<OrderWithItems>, sqlx::Error> {
        let result = sqlx::query("UPDATE orders SET notes = COALESCE($2, notes) WHERE id = $1")
            .bind(id)
            .bind(&input.notes)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_with_items(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct OrderItemRepo;

impl OrderItemRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderItem>, sqlx::Error> {
        let query = format!("{ITEM_SELECT} WHERE oi.id = $1");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("{ITEM_SELECT} WHERE oi.order_id = $1 ORDER BY oi.id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_orders(
        pool: &PgPool,
        order_ids: &[DbId],
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("{ITEM_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.order_id, oi.id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("{ITEM_SELECT} WHERE oi.id = ANY($1) ORDER BY oi.order_id, oi.id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &OrderItemListParams,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!(
            "{ITEM_SELECT}
             JOIN orders o ON o.id = oi.order_id
             WHERE ($1::TEXT IS NULL OR s.code = $1)
               AND ($2::BIGINT IS NULL OR o.member_id = $2)
               AND ($3::BIGINT IS NULL OR oi.item_id = $3)
             ORDER BY oi.created_at DESC, oi.id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(&params.status)
            .bind(params.member_id)
            .bind(params.item_id)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Update size, quantity or notes. Status changes go through
    /// [`OrderItemRepo::change_status`].
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOrderItem,
    ) -> Result<Option<OrderItem>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE order_items SET
                size = COALESCE($2, size),
                quantity = COALESCE($3, quantity),
                notes = COALESCE($4, notes)
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.size)
        .bind(input.quantity)
        .bind(&input.notes)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move one item to `target`, stamping dates and writing history.
    ///
    /// Returns `None` when the item does not exist.
    pub async fn change_status(
        pool: &PgPool,
        id: DbId,
        target: &OrderStatus,
        changed_by_id: Option<DbId>,
        notes: Option<&str>,
    ) -> Result<Option<StatusChange>, RepoError> {
        let mut tx = pool.begin().await?;
        let Some((from_code, from_name)) = lock_current_status(&mut tx, id).await? else {
            return Ok(None);
        };
        validate_transition(&from_code, &target.code)?;
        apply_status(&mut tx, id, &from_name, target, changed_by_id, notes).await?;
        tx.commit().await?;

        let item = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(Some(StatusChange {
            item,
            from_code,
            from_name,
        }))
    }

    /// Validate `target` against every item and apply it to those allowed.
    ///
    /// Unknown IDs are reported in `errors`; blocked items are left untouched.
    pub async fn bulk_change_status(
        pool: &PgPool,
        ids: &[DbId],
        target: &OrderStatus,
        changed_by_id: Option<DbId>,
        notes: Option<&str>,
    ) -> Result<(BulkValidation, Vec<OrderItem>), RepoError> {
        let mut tx = pool.begin().await?;
        let rows: Vec<(DbId, String, String)> = sqlx::query_as(
            "SELECT oi.id, s.code, s.name FROM order_items oi
             JOIN order_statuses s ON s.id = oi.status_id
             WHERE oi.id = ANY($1)
             ORDER BY oi.id
             FOR UPDATE OF oi",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let current: Vec<(DbId, String)> =
            rows.iter().map(|(id, code, _)| (*id, code.clone())).collect();
        let mut validation = validate_bulk(&current, &target.code);
        for id in ids {
            if !rows.iter().any(|(found, _, _)| found == id) {
                validation.errors.push(format!("Order item {id} not found"));
            }
        }

        for (id, _, from_name) in rows.iter().filter(|(id, _, _)| validation.allowed.contains(id)) {
            apply_status(&mut tx, *id, from_name, target, changed_by_id, notes).await?;
        }
        tx.commit().await?;

        let updated = Self::find_many(pool, &validation.allowed).await?;
        Ok((validation, updated))
    }

    /// Status history of an item, newest first.
    pub async fn history(
        pool: &PgPool,
        order_item_id: DbId,
    ) -> Result<Vec<OrderItemStatusHistory>, sqlx::Error> {
        sqlx::query_as::<_, OrderItemStatusHistory>(
            "SELECT h.id, h.order_item_id, h.from_status_id, fs.name AS from_status_name,
                    h.to_status_id, ts.name AS to_status_name, h.changed_by_id,
                    h.changed_at, h.notes
             FROM order_item_status_history h
             LEFT JOIN order_statuses fs ON fs.id = h.from_status_id
             JOIN order_statuses ts ON ts.id = h.to_status_id
             WHERE h.order_item_id = $1
             ORDER BY h.changed_at DESC, h.id DESC",
        )
        .bind(order_item_id)
        .fetch_all(pool)
        .await
    }

    /// Ordered quantity per status code.
    pub async fn status_quantities(pool: &PgPool) -> Result<Vec<StatusQuantity>, sqlx::Error> {
        sqlx::query_as::<_, StatusQuantity>(
            "SELECT s.code, COALESCE(SUM(oi.quantity), 0)::BIGINT AS quantity
             FROM order_items oi
             JOIN order_statuses s ON s.id = oi.status_id
             GROUP BY s.code
             ORDER BY s.code",
        )
        .fetch_all(pool)
        .await
    }

    /// Quantities per catalog item and size for items in one of `codes`.
    pub async fn shopping_list(
        pool: &PgPool,
        codes: &[String],
    ) -> Result<Vec<ShoppingListRow>, sqlx::Error> {
        sqlx::query_as::<_, ShoppingListRow>(
            "SELECT it.id AS item_id, it.name AS item_name, it.category, oi.size,
                    SUM(oi.quantity)::BIGINT AS quantity
             FROM order_items oi
             JOIN orderable_items it ON it.id = oi.item_id
             JOIN order_statuses s ON s.id = oi.status_id
             WHERE s.code = ANY($1)
             GROUP BY it.id, it.name, it.category, oi.size
             ORDER BY it.category, it.name, oi.size NULLS FIRST",
        )
        .bind(codes)
        .fetch_all(pool)
        .await
    }
}

/// Lock an order item row and return its current status code and name.
async fn lock_current_status(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> Result<Option<(String, String)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT s.code, s.name FROM order_items oi
         JOIN order_statuses s ON s.id = oi.status_id
         WHERE oi.id = $1
         FOR UPDATE OF oi",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

async fn apply_status(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
    from_name: &str,
    target: &OrderStatus,
    changed_by_id: Option<DbId>,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    let stamps = date_stamps(&target.code);
    let (from_status_id,): (DbId,) = sqlx::query_as(
        "UPDATE order_items oi SET
            status_id = $2,
            received_date = CASE WHEN $3 THEN COALESCE(received_date, CURRENT_DATE) ELSE received_date END,
            delivered_date = CASE WHEN $4 THEN COALESCE(delivered_date, CURRENT_DATE) ELSE delivered_date END
         FROM (SELECT status_id AS old_status_id FROM order_items WHERE id = $1) prev
         WHERE oi.id = $1
         RETURNING prev.old_status_id",
    )
    .bind(id)
    .bind(target.id)
    .bind(stamps.received)
    .bind(stamps.delivered)
    .fetch_one(&mut **tx)
    .await?;

    let note = notes
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_history_note(Some(from_name), &target.name));
    sqlx::query(
        "INSERT INTO order_item_status_history
            (order_item_id, from_status_id, to_status_id, changed_by_id, notes)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(from_status_id)
    .bind(target.id)
    .bind(changed_by_id)
    .bind(note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
