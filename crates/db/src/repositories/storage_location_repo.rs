//! Repository for the `storage_locations` table.

use std::collections::HashMap;

use clubhouse_core::inventory::{ancestor_chain, location_path};
use clubhouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::inventory::{
    CreateStorageLocation, StorageLocation, StorageLocationResponse, UpdateStorageLocation,
};

const COLUMNS: &str = "id, name, parent_id, is_member, member_id, created_at, updated_at";

pub struct StorageLocationRepo;

impl StorageLocationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateStorageLocation,
    ) -> Result<StorageLocation, sqlx::Error> {
        let query = format!(
            "INSERT INTO storage_locations (name, parent_id, is_member, member_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StorageLocation>(&query)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(input.is_member)
            .bind(input.member_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StorageLocation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM storage_locations WHERE id = $1");
        sqlx::query_as::<_, StorageLocation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The member location of a member, if provisioned.
    pub async fn find_for_member(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Option<StorageLocation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM storage_locations WHERE member_id = $1");
        sqlx::query_as::<_, StorageLocation>(&query)
            .bind(member_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<StorageLocation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM storage_locations ORDER BY name, id");
        sqlx::query_as::<_, StorageLocation>(&query)
            .fetch_all(pool)
            .await
    }

    /// Map of every location to its parent, for hierarchy checks.
    pub async fn parent_map(pool: &PgPool) -> Result<HashMap<DbId, Option<DbId>>, sqlx::Error> {
        let rows: Vec<(DbId, Option<DbId>)> =
            sqlx::query_as("SELECT id, parent_id FROM storage_locations")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// All locations with rendered path and depth.
    pub async fn list_with_paths(
        pool: &PgPool,
    ) -> Result<Vec<StorageLocationResponse>, sqlx::Error> {
        let locations = Self::list(pool).await?;
        let parents: HashMap<DbId, Option<DbId>> =
            locations.iter().map(|l| (l.id, l.parent_id)).collect();
        let names: HashMap<DbId, String> =
            locations.iter().map(|l| (l.id, l.name.clone())).collect();
        Ok(locations
            .into_iter()
            .map(|location| with_path(location, &parents, &names))
            .collect())
    }

    /// A single location with rendered path and depth.
    pub async fn find_with_path(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StorageLocationResponse>, sqlx::Error> {
        Ok(Self::list_with_paths(pool)
            .await?
            .into_iter()
            .find(|l| l.location.id == id))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStorageLocation,
    ) -> Result<Option<StorageLocation>, sqlx::Error> {
        let query = format!(
            "UPDATE storage_locations SET
                name = COALESCE($2, name),
                parent_id = COALESCE($3, parent_id),
                is_member = COALESCE($4, is_member),
                member_id = COALESCE($5, member_id)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StorageLocation>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(input.is_member)
            .bind(input.member_id)
            .fetch_optional(pool)
            .await
    }

    /// Fails with a foreign key violation while child locations exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM storage_locations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Create a member location for every member without one.
    ///
    /// Returns the created locations.
    pub async fn provision_member_locations(
        pool: &PgPool,
    ) -> Result<Vec<StorageLocation>, sqlx::Error> {
        let query = format!(
            "INSERT INTO storage_locations (name, is_member, member_id)
             SELECT TRIM(m.name || ' ' || m.lastname), true, m.id
             FROM members m
             WHERE NOT EXISTS (SELECT 1 FROM storage_locations l WHERE l.member_id = m.id)
             ORDER BY m.lastname, m.name
             ON CONFLICT DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StorageLocation>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storage_locations")
            .fetch_one(pool)
            .await?;
        Ok(n)
    }
}

fn with_path(
    location: StorageLocation,
    parents: &HashMap<DbId, Option<DbId>>,
    names: &HashMap<DbId, String>,
) -> StorageLocationResponse {
    let chain = ancestor_chain(location.id, parents);
    let full_path = location_path(
        chain
            .iter()
            .filter_map(|id| names.get(id).map(String::as_str)),
    );
    StorageLocationResponse {
        level: chain.len().saturating_sub(1),
        full_path,
        location,
    }
}
