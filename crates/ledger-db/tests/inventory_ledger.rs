//! Allocation to stores, returns, and the lot mirror of the general
//! warehouse.

mod common;

use common::*;
use ledger_core::{
    CoreError, Currency, InventoryItemRequest, Lot, ReturnItemRequest, StockStatus,
    TransferDirection, UpdateLotRequest,
};
use ledger_db::DbError;

fn by_number<'a>(lots: &'a [Lot], number: &str) -> &'a Lot {
    lots.iter().find(|l| l.lot_number == number).unwrap()
}

#[tokio::test]
async fn test_creating_lots_stocks_general_warehouse() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Rice",
        Currency::Usd,
        vec![lot("R-1", 5, date(2024, 1, 1), 1000)],
    )
    .await;
    let lot = &lots_of(&tree)[0];

    assert_eq!(held(&fx, fx.general.id, lot.id).await, 5);
    assert_eq!(lot_quantity(&fx, lot.id).await, 5);
}

#[tokio::test]
async fn test_allocation_consumes_oldest_lot_first() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Beans",
        Currency::Usd,
        vec![
            lot("B-NEW", 5, date(2024, 2, 1), 1000),
            lot("B-OLD", 5, date(2024, 1, 1), 1000),
        ],
    )
    .await;
    let lots = lots_of(&tree);
    let old = by_number(&lots, "B-OLD");
    let new = by_number(&lots, "B-NEW");

    let movements = fx
        .db
        .inventory()
        .add_inventory(
            fx.tenant.id,
            fx.store.id,
            &[InventoryItemRequest {
                product_id: tree.product.id,
                variant_id: tree.variants[0].variant.id,
                lot_id: None,
                quantity: 7,
            }],
        )
        .await
        .unwrap();

    assert_eq!(movements.len(), 2);
    assert_eq!((movements[0].lot_id, movements[0].quantity), (old.id, 5));
    assert_eq!((movements[1].lot_id, movements[1].quantity), (new.id, 2));

    assert_eq!(held(&fx, fx.general.id, old.id).await, 0);
    assert_eq!(held(&fx, fx.general.id, new.id).await, 3);
    assert_eq!(held(&fx, fx.store_wh.id, old.id).await, 5);
    assert_eq!(held(&fx, fx.store_wh.id, new.id).await, 2);
    assert_eq!(lot_quantity(&fx, old.id).await, 0);
    assert_eq!(lot_quantity(&fx, new.id).await, 3);

    let logs = fx.db.inventory().transfer_logs(fx.tenant.id, old.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].direction, TransferDirection::ToStore);
}

#[tokio::test]
async fn test_short_batch_changes_nothing() {
    let fx = setup().await;
    let oil = product(
        &fx,
        "Oil",
        Currency::Lrd,
        vec![lot("O-1", 10, date(2024, 1, 1), 40000)],
    )
    .await;
    let salt = product(
        &fx,
        "Salt",
        Currency::Usd,
        vec![lot("S-1", 5, date(2024, 1, 1), 100)],
    )
    .await;
    let oil_lot = lots_of(&oil)[0].id;
    let salt_lot = lots_of(&salt)[0].id;

    let err = fx
        .db
        .inventory()
        .add_inventory(
            fx.tenant.id,
            fx.store.id,
            &[
                InventoryItemRequest {
                    product_id: oil.product.id,
                    variant_id: oil.variants[0].variant.id,
                    lot_id: None,
                    quantity: 3,
                },
                InventoryItemRequest {
                    product_id: salt.product.id,
                    variant_id: salt.variants[0].variant.id,
                    lot_id: Some(salt_lot),
                    quantity: 6,
                },
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock {
            requested: 6,
            available: 5,
            ..
        })
    ));
    assert_eq!(held(&fx, fx.general.id, oil_lot).await, 10);
    assert_eq!(held(&fx, fx.general.id, salt_lot).await, 5);
    assert_eq!(held(&fx, fx.store_wh.id, oil_lot).await, 0);
    assert_eq!(lot_quantity(&fx, oil_lot).await, 10);
    assert_eq!(lot_quantity(&fx, salt_lot).await, 5);
}

#[tokio::test]
async fn test_allocate_then_return_restores_general_and_lot() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Sugar",
        Currency::Usd,
        vec![lot("SG-1", 5, date(2024, 1, 1), 300)],
    )
    .await;
    let lot = lots_of(&tree)[0].clone();

    allocate(&fx, &tree, 4).await;
    assert_eq!(held(&fx, fx.general.id, lot.id).await, 1);

    let movements = fx
        .db
        .inventory()
        .return_inventory(
            fx.tenant.id,
            fx.store.id,
            &[ReturnItemRequest {
                product_id: tree.product.id,
                variant_id: tree.variants[0].variant.id,
                lot_id: lot.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();

    assert_eq!(movements.iter().map(|m| m.quantity).sum::<i64>(), 4);
    assert_eq!(held(&fx, fx.general.id, lot.id).await, 5);
    assert_eq!(held(&fx, fx.store_wh.id, lot.id).await, 0);
    assert_eq!(lot_quantity(&fx, lot.id).await, 5);

    let logs = fx.db.inventory().transfer_logs(fx.tenant.id, lot.id).await.unwrap();
    assert!(logs.iter().all(|l| l.direction == TransferDirection::ToGeneral));
}

#[tokio::test]
async fn test_return_more_than_store_holds_is_rejected() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Flour",
        Currency::Usd,
        vec![lot("F-1", 5, date(2024, 1, 1), 500)],
    )
    .await;
    let lot = lots_of(&tree)[0].clone();
    allocate(&fx, &tree, 2).await;

    let err = fx
        .db
        .inventory()
        .return_inventory(
            fx.tenant.id,
            fx.store.id,
            &[ReturnItemRequest {
                product_id: tree.product.id,
                variant_id: tree.variants[0].variant.id,
                lot_id: lot.id,
                quantity: 3,
            }],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_core(),
        Some(CoreError::InsufficientStock { available: 2, .. })
    ));
    assert_eq!(held(&fx, fx.store_wh.id, lot.id).await, 2);
}

#[tokio::test]
async fn test_lot_quantity_edit_follows_into_general_until_distributed() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Tea",
        Currency::Usd,
        vec![lot("T-1", 5, date(2024, 1, 1), 200)],
    )
    .await;
    let lot = lots_of(&tree)[0].clone();

    let edited = fx
        .db
        .catalog()
        .update_lot(
            fx.tenant.id,
            lot.id,
            &UpdateLotRequest {
                quantity: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.quantity, 8);
    assert_eq!(held(&fx, fx.general.id, lot.id).await, 8);

    allocate(&fx, &tree, 1).await;

    let err = fx
        .db
        .catalog()
        .update_lot(
            fx.tenant.id,
            lot.id,
            &UpdateLotRequest {
                quantity: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidState { .. })));
    assert_eq!(lot_quantity(&fx, lot.id).await, 7);
}

#[tokio::test]
async fn test_store_stock_summary_reports_status() {
    let fx = setup().await;
    let tree = product(
        &fx,
        "Soap",
        Currency::Usd,
        vec![lot("SP-1", 10, date(2024, 1, 1), 150)],
    )
    .await;
    allocate(&fx, &tree, 2).await;

    let summary = fx
        .db
        .inventory()
        .warehouse_stock(fx.tenant.id, fx.store_wh.id)
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].quantity, 2);
    assert_eq!(summary[0].status, StockStatus::LowStock);
}
