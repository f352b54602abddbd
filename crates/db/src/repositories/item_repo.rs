//! Repositories for the `items` and `item_variants` tables.

use clubhouse_core::inventory::DEFAULT_BASE_UNIT;
use clubhouse_core::types::DbId;
use serde_json::Value;
use sqlx::PgPool;

use crate::models::inventory::{
    CreateItem, CreateItemVariant, Item, ItemListParams, ItemVariant, UpdateItem,
    UpdateItemVariant,
};
use crate::{clamp_limit, clamp_offset};

/// Item columns with the category name and the derived stock total.
const ITEM_SELECT: &str = "SELECT i.id, i.name, i.category_id, c.name AS category_name, \
    i.base_unit, i.attributes, i.is_variant_parent, i.size, i.identifier1, i.identifier2, \
    i.rented_by_id, \
    CASE WHEN i.is_variant_parent THEN \
        COALESCE((SELECT SUM(s.quantity) FROM stock s \
                  JOIN item_variants v ON v.id = s.item_variant_id \
                  WHERE v.parent_item_id = i.id), 0) \
    ELSE COALESCE((SELECT SUM(s.quantity) FROM stock s WHERE s.item_id = i.id), 0) \
    END::BIGINT AS total_stock, \
    i.created_at, i.updated_at \
    FROM items i JOIN inventory_categories c ON c.id = i.category_id";

const VARIANT_SELECT: &str = "SELECT v.id, v.parent_item_id, i.name AS parent_name, \
    i.attributes AS parent_attributes, v.variant_attributes, v.sku, \
    COALESCE((SELECT SUM(s.quantity) FROM stock s WHERE s.item_variant_id = v.id), 0)::BIGINT \
        AS total_stock, \
    v.created_at, v.updated_at \
    FROM item_variants v JOIN items i ON i.id = v.parent_item_id";

pub struct ItemRepo;

impl ItemRepo {
    pub async fn create(pool: &PgPool, input: &CreateItem) -> Result<Item, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO items (name, category_id, base_unit, attributes, is_variant_parent,
                                size, identifier1, identifier2, rented_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(input.category_id)
        .bind(input.base_unit.as_deref().unwrap_or(DEFAULT_BASE_UNIT))
        .bind(
            input
                .attributes
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        )
        .bind(input.is_variant_parent)
        .bind(&input.size)
        .bind(&input.identifier1)
        .bind(&input.identifier2)
        .bind(input.rented_by_id)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Item>, sqlx::Error> {
        let query = format!("{ITEM_SELECT} WHERE i.id = $1");
        sqlx::query_as::<_, Item>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, params: &ItemListParams) -> Result<Vec<Item>, sqlx::Error> {
        let query = format!(
            "{ITEM_SELECT}
             WHERE ($1::BIGINT IS NULL OR i.category_id = $1)
               AND ($2::TEXT IS NULL OR i.name ILIKE '%' || $2 || '%')
             ORDER BY i.name
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Item>(&query)
            .bind(params.category_id)
            .bind(params.search.as_deref().filter(|s| !s.trim().is_empty()))
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(pool)
            .await?;
        Ok(n)
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateItem,
    ) -> Result<Option<Item>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE items SET
                name = COALESCE($2, name),
                category_id = COALESCE($3, category_id),
                base_unit = COALESCE($4, base_unit),
                attributes = COALESCE($5, attributes),
                is_variant_parent = COALESCE($6, is_variant_parent),
                size = COALESCE($7, size),
                identifier1 = COALESCE($8, identifier1),
                identifier2 = COALESCE($9, identifier2),
                rented_by_id = COALESCE($10, rented_by_id)
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.category_id)
        .bind(&input.base_unit)
        .bind(&input.attributes)
        .bind(input.is_variant_parent)
        .bind(&input.size)
        .bind(&input.identifier1)
        .bind(&input.identifier2)
        .bind(input.rented_by_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct ItemVariantRepo;

impl ItemVariantRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateItemVariant,
    ) -> Result<ItemVariant, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO item_variants (parent_item_id, variant_attributes, sku)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(input.parent_item_id)
        .bind(&input.variant_attributes)
        .bind(&input.sku)
        .fetch_one(pool)
        .await?;
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ItemVariant>, sqlx::Error> {
        let query = format!("{VARIANT_SELECT} WHERE v.id = $1");
        sqlx::query_as::<_, ItemVariant>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Variants, optionally restricted to one parent item.
    pub async fn list(
        pool: &PgPool,
        parent_item_id: Option<DbId>,
    ) -> Result<Vec<ItemVariant>, sqlx::Error> {
        let query = format!(
            "{VARIANT_SELECT}
             WHERE ($1::BIGINT IS NULL OR v.parent_item_id = $1)
             ORDER BY i.name, v.id"
        );
        sqlx::query_as::<_, ItemVariant>(&query)
            .bind(parent_item_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateItemVariant,
    ) -> Result<Option<ItemVariant>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE item_variants SET
                variant_attributes = COALESCE($2, variant_attributes),
                sku = COALESCE($3, sku)
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.variant_attributes)
        .bind(&input.sku)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM item_variants WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
