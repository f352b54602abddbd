//! Repository for the `parents` table and its `parent_children` links.

use clubhouse_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::member::{CreateParent, Parent, UpdateParent};

const COLUMNS: &str = "id, name, lastname, email, email2, street, zip_code, city, \
                        phone, mobile, notes, created_at, updated_at";

pub struct ParentRepo;

impl ParentRepo {
    /// Insert a parent together with its child links.
    pub async fn create(pool: &PgPool, input: &CreateParent) -> Result<Parent, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO parents (name, lastname, email, email2, street, zip_code, city,
                                  phone, mobile, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let parent = sqlx::query_as::<_, Parent>(&query)
            .bind(&input.name)
            .bind(&input.lastname)
            .bind(&input.email)
            .bind(&input.email2)
            .bind(&input.street)
            .bind(&input.zip_code)
            .bind(&input.city)
            .bind(&input.phone)
            .bind(&input.mobile)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;
        set_children(&mut tx, parent.id, &input.children).await?;
        tx.commit().await?;
        Ok(parent)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Parent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM parents WHERE id = $1");
        sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<Parent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parents
             WHERE ($1::TEXT IS NULL
                    OR name ILIKE '%' || $1 || '%'
                    OR lastname ILIKE '%' || $1 || '%'
                    OR email ILIKE '%' || $1 || '%')
             ORDER BY lastname, name"
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(search)
            .fetch_all(pool)
            .await
    }

    /// Parents linked to a member.
    pub async fn list_for_member(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Vec<Parent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parents
             WHERE id IN (SELECT parent_id FROM parent_children WHERE member_id = $1)
             ORDER BY lastname, name"
        );
        sqlx::query_as::<_, Parent>(&query)
            .bind(member_id)
            .fetch_all(pool)
            .await
    }

    /// Member IDs linked to a parent.
    pub async fn children_ids(pool: &PgPool, parent_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT member_id FROM parent_children WHERE parent_id = $1 ORDER BY member_id",
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Update a parent. When `children` is present the links are replaced.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateParent,
    ) -> Result<Option<Parent>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE parents SET
                name = COALESCE($2, name),
                lastname = COALESCE($3, lastname),
                email = COALESCE($4, email),
                email2 = COALESCE($5, email2),
                street = COALESCE($6, street),
                zip_code = COALESCE($7, zip_code),
                city = COALESCE($8, city),
                phone = COALESCE($9, phone),
                mobile = COALESCE($10, mobile),
                notes = COALESCE($11, notes)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let parent = sqlx::query_as::<_, Parent>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.lastname)
            .bind(&input.email)
            .bind(&input.email2)
            .bind(&input.street)
            .bind(&input.zip_code)
            .bind(&input.city)
            .bind(&input.phone)
            .bind(&input.mobile)
            .bind(&input.notes)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(parent) = parent else {
            return Ok(None);
        };
        if let Some(children) = &input.children {
            set_children(&mut tx, id, children).await?;
        }
        tx.commit().await?;
        Ok(Some(parent))
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM parents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn set_children(
    tx: &mut Transaction<'_, Postgres>,
    parent_id: DbId,
    children: &[DbId],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM parent_children WHERE parent_id = $1")
        .bind(parent_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO parent_children (parent_id, member_id)
         SELECT $1, UNNEST($2::bigint[])
         ON CONFLICT DO NOTHING",
    )
    .bind(parent_id)
    .bind(children)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
