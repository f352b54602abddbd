//! Repository for the `inventory_categories` table.

use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::inventory::{Category, CreateCategory, UpdateCategory};

const COLUMNS: &str = "id, name, schema, created_at, updated_at";

pub struct CategoryRepo;

impl CategoryRepo {
    pub async fn create(pool: &PgPool, input: &CreateCategory) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_categories (name, schema) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .bind(&input.schema)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inventory_categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inventory_categories ORDER BY name");
        sqlx::query_as::<_, Category>(&query).fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCategory,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!(
            "UPDATE inventory_categories SET
                name = COALESCE($2, name),
                schema = COALESCE($3, schema)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.schema)
            .fetch_optional(pool)
            .await
    }

    /// Fails with a foreign key violation while items still use the category.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inventory_categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
