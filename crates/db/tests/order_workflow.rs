//! Order status workflow against a real database: transitions, history,
//! date stamps and bulk changes.

use assert_matches::assert_matches;
use clubhouse_core::error::CoreError;
use clubhouse_db::models::member::CreateMember;
use clubhouse_db::models::order::{CreateOrder, CreateOrderItem, CreateOrderableItem, OrderStatus};
use clubhouse_db::repositories::{
    MemberRepo, OrderItemRepo, OrderRepo, OrderStatusRepo, OrderableItemRepo,
};
use clubhouse_db::RepoError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn status(pool: &PgPool, code: &str) -> OrderStatus {
    OrderStatusRepo::find_by_code(pool, code)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("status {code} should be seeded"))
}

/// Create a member and an order with `count` single-quantity items.
async fn order_with_items(pool: &PgPool, count: usize) -> Vec<i64> {
    let member = MemberRepo::create(
        pool,
        &CreateMember {
            name: "Lena".into(),
            lastname: "Berger".into(),
            email: Some("lena@example.org".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let item = OrderableItemRepo::create(
        pool,
        &CreateOrderableItem {
            name: "Einsatzjacke".into(),
            category: "Bekleidung".into(),
            description: None,
            has_sizes: true,
            available_sizes: "S, M, L".into(),
            is_active: None,
        },
    )
    .await
    .unwrap();

    let items = (0..count)
        .map(|_| CreateOrderItem {
            item_id: item.id,
            size: Some("M".into()),
            quantity: None,
            notes: None,
        })
        .collect();
    let order = OrderRepo::create(
        pool,
        &CreateOrder {
            member_id: member.id,
            notes: None,
            items,
        },
        None,
    )
    .await
    .unwrap();
    order.items.iter().map(|i| i.id).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_new_items_start_pending(pool: PgPool) {
    let ids = order_with_items(&pool, 2).await;
    for id in ids {
        let item = OrderItemRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(item.status_code, "pending");
        assert_eq!(item.quantity, 1);
        assert!(OrderItemRepo::history(&pool, id).await.unwrap().is_empty());
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_walk_to_delivered_stamps_dates(pool: PgPool) {
    let id = order_with_items(&pool, 1).await[0];

    for code in ["ordered", "received", "ready", "delivered"] {
        let target = status(&pool, code).await;
        let change = OrderItemRepo::change_status(&pool, id, &target, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.item.status_code, code);
    }

    let item = OrderItemRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert!(item.received_date.is_some(), "received date should be stamped");
    assert!(item.delivered_date.is_some(), "delivered date should be stamped");

    let history = OrderItemRepo::history(&pool, id).await.unwrap();
    assert_eq!(history.len(), 4);
    let latest = &history[0];
    assert_eq!(latest.to_status_name, status(&pool, "delivered").await.name);
    assert!(latest.notes.as_deref().unwrap().starts_with("Status changed from"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_transition_leaves_item_unchanged(pool: PgPool) {
    let id = order_with_items(&pool, 1).await[0];
    let delivered = status(&pool, "delivered").await;

    let result = OrderItemRepo::change_status(&pool, id, &delivered, None, None).await;
    assert_matches!(result, Err(RepoError::Rule(CoreError::Validation(_))));

    let item = OrderItemRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(item.status_code, "pending");
    assert!(OrderItemRepo::history(&pool, id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_same_status_rejected(pool: PgPool) {
    let id = order_with_items(&pool, 1).await[0];
    let pending = status(&pool, "pending").await;
    let result = OrderItemRepo::change_status(&pool, id, &pending, None, None).await;
    assert_matches!(
        result,
        Err(RepoError::Rule(CoreError::Validation(msg))) if msg.contains("already")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_status_unknown_item(pool: PgPool) {
    let ordered = status(&pool, "ordered").await;
    let result = OrderItemRepo::change_status(&pool, 999_999, &ordered, None, None)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_explicit_note_is_recorded(pool: PgPool) {
    let id = order_with_items(&pool, 1).await[0];
    let cancelled = status(&pool, "cancelled").await;
    OrderItemRepo::change_status(&pool, id, &cancelled, None, Some("Member left"))
        .await
        .unwrap()
        .unwrap();

    let history = OrderItemRepo::history(&pool, id).await.unwrap();
    assert_eq!(history[0].notes.as_deref(), Some("Member left"));
    assert_eq!(history[0].from_status_name.as_deref(), Some(status(&pool, "pending").await.name.as_str()));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_change_splits_allowed_and_blocked(pool: PgPool) {
    let ids = order_with_items(&pool, 3).await;
    let ordered = status(&pool, "ordered").await;
    let received = status(&pool, "received").await;

    OrderItemRepo::change_status(&pool, ids[0], &ordered, None, None)
        .await
        .unwrap()
        .unwrap();

    let mut request = ids.clone();
    request.push(424_242);
    let (validation, updated) =
        OrderItemRepo::bulk_change_status(&pool, &request, &received, None, None)
            .await
            .unwrap();

    assert_eq!(validation.allowed, vec![ids[0]]);
    assert_eq!(validation.blocked.len(), 2);
    assert_eq!(validation.errors, vec!["Order item 424242 not found".to_string()]);
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].status_code, "received");

    let untouched = OrderItemRepo::find_by_id(&pool, ids[1]).await.unwrap().unwrap();
    assert_eq!(untouched.status_code, "pending");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_shopping_list_groups_by_size(pool: PgPool) {
    order_with_items(&pool, 3).await;
    let rows = OrderItemRepo::shopping_list(&pool, &["pending".to_string()])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].size.as_deref(), Some("M"));
    assert_eq!(rows[0].quantity, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_order_cascades_items(pool: PgPool) {
    let ids = order_with_items(&pool, 2).await;
    let item = OrderItemRepo::find_by_id(&pool, ids[0]).await.unwrap().unwrap();
    assert!(OrderRepo::delete(&pool, item.order_id).await.unwrap());
    assert!(OrderItemRepo::find_by_id(&pool, ids[1]).await.unwrap().is_none());
}
