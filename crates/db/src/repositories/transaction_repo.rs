//! The inventory ledger: `inventory_transactions` plus the stock effects each
//! entry applies.

use clubhouse_core::inventory::{
    insufficient_stock, missing_source_stock, plan_stock_effects, ItemRef, StockEffect,
};
use clubhouse_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::inventory::{CreateTransaction, InventoryTransaction, TransactionListParams};
use crate::{clamp_limit, clamp_offset, RepoError};

const COLUMNS: &str = "id, transaction_type, item_id, item_variant_id, source_id, target_id, \
                        quantity, date, note, user_id, created_at";

pub struct TransactionRepo;

impl TransactionRepo {
    /// Validate and book a ledger entry.
    ///
    /// The transaction row and all stock effects are written in one database
    /// transaction; a failed debit leaves neither behind.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTransaction,
        user_id: Option<DbId>,
    ) -> Result<InventoryTransaction, RepoError> {
        let item = ItemRef::from_ids(input.item_id, input.item_variant_id)?;
        let effects = plan_stock_effects(
            input.transaction_type,
            input.source_id,
            input.target_id,
            input.quantity,
        )?;

        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO inventory_transactions
                (transaction_type, item_id, item_variant_id, source_id, target_id,
                 quantity, date, note, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8, $9)
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(input.transaction_type.as_str())
            .bind(item.item_id())
            .bind(item.variant_id())
            .bind(input.source_id)
            .bind(input.target_id)
            .bind(input.quantity)
            .bind(input.date)
            .bind(&input.note)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        for effect in &effects {
            apply_effect(&mut tx, item, *effect).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            transaction_id = entry.id,
            kind = %input.transaction_type,
            quantity = input.quantity,
            "Ledger entry booked"
        );
        Ok(entry)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<InventoryTransaction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inventory_transactions WHERE id = $1");
        sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Ledger entries, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &TransactionListParams,
    ) -> Result<Vec<InventoryTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inventory_transactions
             WHERE ($1::TEXT IS NULL OR transaction_type = $1)
               AND ($2::BIGINT IS NULL OR item_id = $2)
               AND ($3::BIGINT IS NULL OR item_variant_id = $3)
               AND ($4::BIGINT IS NULL OR source_id = $4 OR target_id = $4)
             ORDER BY date DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(params.transaction_type.as_deref().map(str::to_uppercase))
            .bind(params.item_id)
            .bind(params.item_variant_id)
            .bind(params.location_id)
            .bind(clamp_limit(params.limit))
            .bind(clamp_offset(params.offset))
            .fetch_all(pool)
            .await
    }

    /// The `limit` most recent entries.
    pub async fn recent(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<InventoryTransaction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inventory_transactions ORDER BY date DESC, id DESC LIMIT $1"
        );
        sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

/// Apply one stock effect inside the booking transaction.
async fn apply_effect(
    tx: &mut Transaction<'_, Postgres>,
    item: ItemRef,
    effect: StockEffect,
) -> Result<(), RepoError> {
    let (column, id) = match item {
        ItemRef::Item(id) => ("item_id", id),
        ItemRef::Variant(id) => ("item_variant_id", id),
    };

    if effect.delta < 0 {
        let amount = -effect.delta;
        let query = format!(
            "UPDATE stock SET quantity = quantity - $3
             WHERE {column} = $1 AND location_id = $2 AND quantity >= $3
             RETURNING quantity"
        );
        let updated: Option<(i32,)> = sqlx::query_as(&query)
            .bind(id)
            .bind(effect.location_id)
            .bind(amount)
            .fetch_optional(&mut **tx)
            .await?;
        if updated.is_some() {
            return Ok(());
        }

        let query = format!("SELECT quantity FROM stock WHERE {column} = $1 AND location_id = $2");
        let available: Option<(i32,)> = sqlx::query_as(&query)
            .bind(id)
            .bind(effect.location_id)
            .fetch_optional(&mut **tx)
            .await?;
        return Err(match available {
            Some((quantity,)) => insufficient_stock(quantity).into(),
            None => missing_source_stock().into(),
        });
    }

    let query = format!(
        "INSERT INTO stock ({column}, location_id, quantity) VALUES ($1, $2, $3)
         ON CONFLICT ({column}, location_id) WHERE {column} IS NOT NULL
         DO UPDATE SET quantity = stock.quantity + EXCLUDED.quantity"
    );
    sqlx::query(&query)
        .bind(id)
        .bind(effect.location_id)
        .bind(effect.delta)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
