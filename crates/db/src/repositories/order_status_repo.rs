//! Repository for the `order_statuses` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::order::{CreateOrderStatus, OrderStatus, UpdateOrderStatus};

const COLUMNS: &str = "id, name, code, description, color, is_active, sort_order, \
                        created_at, updated_at";

/// Default color for statuses created without one.
pub const DEFAULT_ORDER_STATUS_COLOR: &str = "#6c757d";

pub struct OrderStatusRepo;

impl OrderStatusRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrderStatus,
    ) -> Result<OrderStatus, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_statuses (name, code, description, color, is_active, sort_order)
             VALUES ($1, $2, $3, $4, COALESCE($5, true), COALESCE($6, 0))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderStatus>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(input.color.as_deref().unwrap_or(DEFAULT_ORDER_STATUS_COLOR))
            .bind(input.is_active)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<OrderStatus>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_statuses WHERE code = $1");
        sqlx::query_as::<_, OrderStatus>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<OrderStatus>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_statuses ORDER BY sort_order, name");
        sqlx::query_as::<_, OrderStatus>(&query).fetch_all(pool).await
    }

    /// The code of a status is immutable; the workflow keys off it.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOrderStatus,
    ) -> Result<Option<OrderStatus>, sqlx::Error> {
        let query = format!(
            "UPDATE order_statuses SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                color = COALESCE($4, color),
                is_active = COALESCE($5, is_active),
                sort_order = COALESCE($6, sort_order)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderStatus>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.color)
            .bind(input.is_active)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Fails with a foreign key violation while order items use the status.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM order_statuses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
