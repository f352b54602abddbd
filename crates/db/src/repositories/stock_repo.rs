//! Read access to the `stock` table.
//!
//! Stock rows are only ever written by [`TransactionRepo`](super::TransactionRepo).

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::inventory::{Stock, StockListParams};
use crate::{clamp_limit, clamp_offset};

const SELECT: &str = "SELECT s.id, s.item_id, s.item_variant_id, \
    COALESCE(i.name, vi.name, '') AS item_name, s.location_id, l.name AS location_name, \
    s.quantity, s.updated_at \
    FROM stock s \
    LEFT JOIN items i ON i.id = s.item_id \
    LEFT JOIN item_variants v ON v.id = s.item_variant_id \
    LEFT JOIN items vi ON vi.id = v.parent_item_id \
    JOIN storage_locations l ON l.id = s.location_id";

pub struct StockRepo;

impl StockRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Stock>, sqlx::Error> {
        let query = format!("{SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, Stock>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, params: &StockListParams) -> Result<Vec<Stock>, sqlx::Error> {
        let query = format!(
            "{SELECT}
             WHERE ($1::BIGINT IS NULL OR s.location_id = $1)
               AND ($2::BIGINT IS NULL OR s.item_id = $2)
               AND ($3::BIGINT IS NULL OR s.item_variant_id = $3)
               AND (NOT $4 OR s.quantity > 0)
             ORDER BY l.name, item_name, s.id
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Stock>(&query)
            .bind(params.location_id)
            .bind(params.item_id)
            .bind(params.item_variant_id)
            .bind(params.in_stock_only)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// Positive stock held at a location.
    pub async fn list_in_stock_at(
        pool: &PgPool,
        location_id: DbId,
    ) -> Result<Vec<Stock>, sqlx::Error> {
        let query = format!(
            "{SELECT} WHERE s.location_id = $1 AND s.quantity > 0 ORDER BY item_name, s.id"
        );
        sqlx::query_as::<_, Stock>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    /// Sum of all stock quantities.
    pub async fn total_quantity(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as("SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM stock")
            .fetch_one(pool)
            .await?;
        Ok(n)
    }
}
