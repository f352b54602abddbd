//! Ledger bookings against a real database: stock effects, rejected debits
//! and atomicity.

use assert_matches::assert_matches;
use clubhouse_core::error::CoreError;
use clubhouse_core::inventory::TransactionType;
use clubhouse_db::models::inventory::{
    CreateCategory, CreateItem, CreateItemVariant, CreateStorageLocation, CreateTransaction,
    StockListParams, TransactionListParams,
};
use clubhouse_db::repositories::{
    CategoryRepo, ItemRepo, ItemVariantRepo, StockRepo, StorageLocationRepo, TransactionRepo,
};
use clubhouse_db::RepoError;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    item_id: i64,
    store: i64,
    van: i64,
}

async fn setup(pool: &PgPool) -> Fixture {
    let category = CategoryRepo::create(
        pool,
        &CreateCategory {
            name: "Schläuche".into(),
            schema: None,
        },
    )
    .await
    .unwrap();
    let item = ItemRepo::create(
        pool,
        &CreateItem {
            name: "C-Schlauch".into(),
            category_id: category.id,
            base_unit: None,
            attributes: None,
            is_variant_parent: false,
            size: None,
            identifier1: None,
            identifier2: None,
            rented_by_id: None,
        },
    )
    .await
    .unwrap();
    let store = location(pool, "Lager").await;
    let van = location(pool, "Fahrzeug").await;
    Fixture {
        item_id: item.id,
        store,
        van,
    }
}

async fn location(pool: &PgPool, name: &str) -> i64 {
    StorageLocationRepo::create(
        pool,
        &CreateStorageLocation {
            name: name.into(),
            parent_id: None,
            is_member: false,
            member_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn booking(
    kind: TransactionType,
    item_id: i64,
    source: Option<i64>,
    target: Option<i64>,
    quantity: i32,
) -> CreateTransaction {
    CreateTransaction {
        transaction_type: kind,
        item_id: Some(item_id),
        item_variant_id: None,
        source_id: source,
        target_id: target,
        quantity,
        date: None,
        note: None,
    }
}

async fn quantity_at(pool: &PgPool, item_id: i64, location_id: i64) -> i32 {
    let rows = StockRepo::list(
        pool,
        &StockListParams {
            location_id: Some(location_id),
            item_id: Some(item_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    rows.first().map(|s| s.quantity).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_in_then_out_leaves_balance(pool: PgPool) {
    let f = setup(&pool).await;

    TransactionRepo::create(&pool, &booking(TransactionType::In, f.item_id, None, Some(f.store), 10), None)
        .await
        .unwrap();
    TransactionRepo::create(&pool, &booking(TransactionType::Out, f.item_id, Some(f.store), None, 4), None)
        .await
        .unwrap();

    assert_eq!(quantity_at(&pool, f.item_id, f.store).await, 6);
    let item = ItemRepo::find_by_id(&pool, f.item_id).await.unwrap().unwrap();
    assert_eq!(item.total_stock, 6);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_overdraw_is_rejected_without_ledger_row(pool: PgPool) {
    let f = setup(&pool).await;
    TransactionRepo::create(&pool, &booking(TransactionType::In, f.item_id, None, Some(f.store), 3), None)
        .await
        .unwrap();

    let result = TransactionRepo::create(
        &pool,
        &booking(TransactionType::Out, f.item_id, Some(f.store), None, 5),
        None,
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Rule(CoreError::Validation(msg))) if msg.contains("Available: 3")
    );

    let entries = TransactionRepo::list(&pool, &TransactionListParams::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1, "rejected booking must not leave a ledger row");
    assert_eq!(quantity_at(&pool, f.item_id, f.store).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_debit_without_stock_row(pool: PgPool) {
    let f = setup(&pool).await;
    let result = TransactionRepo::create(
        &pool,
        &booking(TransactionType::Discard, f.item_id, Some(f.van), None, 1),
        None,
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Rule(CoreError::Validation(msg))) if msg.contains("No stock")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_move_conserves_total(pool: PgPool) {
    let f = setup(&pool).await;
    TransactionRepo::create(&pool, &booking(TransactionType::In, f.item_id, None, Some(f.store), 8), None)
        .await
        .unwrap();
    TransactionRepo::create(
        &pool,
        &booking(TransactionType::Move, f.item_id, Some(f.store), Some(f.van), 5),
        None,
    )
    .await
    .unwrap();

    assert_eq!(quantity_at(&pool, f.item_id, f.store).await, 3);
    assert_eq!(quantity_at(&pool, f.item_id, f.van).await, 5);
    assert_eq!(StockRepo::total_quantity(&pool).await.unwrap(), 8);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_same_source_and_target_rejected(pool: PgPool) {
    let f = setup(&pool).await;
    let result = TransactionRepo::create(
        &pool,
        &booking(TransactionType::Move, f.item_id, Some(f.store), Some(f.store), 1),
        None,
    )
    .await;
    assert_matches!(result, Err(RepoError::Rule(CoreError::Validation(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_variant_stock_rolls_up_to_parent(pool: PgPool) {
    let f = setup(&pool).await;
    let parent = ItemRepo::create(
        &pool,
        &CreateItem {
            name: "Jacke".into(),
            category_id: ItemRepo::find_by_id(&pool, f.item_id).await.unwrap().unwrap().category_id,
            base_unit: None,
            attributes: Some(json!({"Material": "Nomex"})),
            is_variant_parent: true,
            size: None,
            identifier1: None,
            identifier2: None,
            rented_by_id: None,
        },
    )
    .await
    .unwrap();
    let small = ItemVariantRepo::create(
        &pool,
        &CreateItemVariant {
            parent_item_id: parent.id,
            variant_attributes: json!({"Größe": "S"}),
            sku: None,
        },
    )
    .await
    .unwrap();
    let large = ItemVariantRepo::create(
        &pool,
        &CreateItemVariant {
            parent_item_id: parent.id,
            variant_attributes: json!({"Größe": "L"}),
            sku: None,
        },
    )
    .await
    .unwrap();

    for (variant, qty) in [(small.id, 2), (large.id, 3)] {
        TransactionRepo::create(
            &pool,
            &CreateTransaction {
                transaction_type: TransactionType::In,
                item_id: None,
                item_variant_id: Some(variant),
                source_id: None,
                target_id: Some(f.store),
                quantity: qty,
                date: None,
                note: None,
            },
            None,
        )
        .await
        .unwrap();
    }

    let parent = ItemRepo::find_by_id(&pool, parent.id).await.unwrap().unwrap();
    assert_eq!(parent.total_stock, 5);
    let large = ItemVariantRepo::find_by_id(&pool, large.id).await.unwrap().unwrap();
    assert_eq!(large.total_stock, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_location_paths(pool: PgPool) {
    let root = location(&pool, "Gerätehaus").await;
    let shelf = StorageLocationRepo::create(
        &pool,
        &CreateStorageLocation {
            name: "Regal A".into(),
            parent_id: Some(root),
            is_member: false,
            member_id: None,
        },
    )
    .await
    .unwrap();

    let found = StorageLocationRepo::find_with_path(&pool, shelf.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.full_path, "Gerätehaus > Regal A");
    assert_eq!(found.level, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_member_location_check_constraint(pool: PgPool) {
    let result = StorageLocationRepo::create(
        &pool,
        &CreateStorageLocation {
            name: "Spind".into(),
            parent_id: None,
            is_member: true,
            member_id: None,
        },
    )
    .await;
    let err = result.unwrap_err();
    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.constraint(), Some("ck_storage_locations_member"));
}
