//! Repository for the `orderable_items` catalog.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::order::{CreateOrderableItem, OrderableItem, UpdateOrderableItem};

const COLUMNS: &str = "id, name, category, description, has_sizes, available_sizes, \
                        is_active, created_at, updated_at";

pub struct OrderableItemRepo;

impl OrderableItemRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrderableItem,
    ) -> Result<OrderableItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO orderable_items (name, category, description, has_sizes, available_sizes, is_active)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderableItem>(&query)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.has_sizes)
            .bind(&input.available_sizes)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderableItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orderable_items WHERE id = $1");
        sqlx::query_as::<_, OrderableItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Catalog entries by category and name; `active_only` hides retired ones.
    pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<OrderableItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orderable_items
             WHERE (NOT $1 OR is_active = true)
             ORDER BY category, name"
        );
        sqlx::query_as::<_, OrderableItem>(&query)
            .bind(active_only)
            .fetch_all(pool)
            .await
    }

    pub async fn find_many(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<OrderableItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orderable_items WHERE id = ANY($1)");
        sqlx::query_as::<_, OrderableItem>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOrderableItem,
    ) -> Result<Option<OrderableItem>, sqlx::Error> {
        let query = format!(
            "UPDATE orderable_items SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                description = COALESCE($4, description),
                has_sizes = COALESCE($5, has_sizes),
                available_sizes = COALESCE($6, available_sizes),
                is_active = COALESCE($7, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderableItem>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.has_sizes)
            .bind(&input.available_sizes)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Fails with a foreign key violation while order items reference it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM orderable_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
