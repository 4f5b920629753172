//! Product trees, restocking, lot edits and duplicate guards.

mod common;

use common::*;
use ledger_core::{
    AttributeInput, CoreError, CreateProductRequest, CreateVariantRequest, Currency, LotChange,
    Money, UpdateLotRequest, UpdateProductRequest, VariantChange,
};

#[tokio::test]
async fn test_update_keeps_existing_ids_and_adds_new_ones() {
    let fx = setup().await;
    let tree = product(&fx, "Soap", Currency::Usd, vec![lot("SP-1", 4, date(2024, 1, 1), 150)]).await;
    let variant = tree.variants[0].variant.clone();
    let first_lot = lots_of(&tree)[0].clone();

    let updated = fx
        .db
        .catalog()
        .update_product(
            fx.tenant.id,
            tree.product.id,
            &UpdateProductRequest {
                name: Some("Bath Soap".to_string()),
                variants: vec![
                    VariantChange::Update {
                        id: variant.id,
                        attributes: Some(vec![
                            AttributeInput::new("Kind", "Soap"),
                            AttributeInput::new("Scent", "Lime"),
                        ]),
                        lots: vec![
                            LotChange::Update {
                                id: first_lot.id,
                                patch: UpdateLotRequest {
                                    quantity: Some(6),
                                    ..Default::default()
                                },
                            },
                            LotChange::Create(lot("SP-2", 3, date(2024, 2, 1), 160)),
                        ],
                    },
                    VariantChange::Create(CreateVariantRequest {
                        attributes: vec![AttributeInput::new("Kind", "Liquid")],
                        lots: vec![lot("LQ-1", 2, date(2024, 1, 15), 300)],
                    }),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.product.id, tree.product.id);
    assert_eq!(updated.product.name, "Bath Soap");
    assert_eq!(updated.variants.len(), 2);

    let kept = &updated.variants[0];
    assert_eq!(kept.variant.id, variant.id);
    assert_eq!(kept.variant.sku, variant.sku);
    assert_eq!(kept.attributes.len(), 2);
    let lots: Vec<(i64, i64)> = kept.lots.iter().map(|l| (l.id, l.quantity)).collect();
    assert_eq!(lots[0], (first_lot.id, 6));
    assert_eq!(lots[1].1, 3);

    let added = &updated.variants[1];
    assert_ne!(added.variant.sku, variant.sku);
    assert_eq!(added.lots[0].quantity, 2);

    // Lot quantities are mirrored in the general warehouse.
    assert_eq!(held(&fx, fx.general.id, first_lot.id).await, 6);
    assert_eq!(held(&fx, fx.general.id, lots[1].0).await, 3);
    assert_eq!(held(&fx, fx.general.id, added.lots[0].id).await, 2);
}

#[tokio::test]
async fn test_restock_adds_a_lot_to_general_stock() {
    let fx = setup().await;
    let tree = product(&fx, "Rice", Currency::Lrd, vec![lot("RC-1", 2, date(2024, 1, 1), 90000)]).await;
    let variant_id = tree.variants[0].variant.id;

    let created = fx
        .db
        .catalog()
        .restock(
            fx.tenant.id,
            tree.product.id,
            variant_id,
            &lot("RC-2", 5, date(2024, 3, 1), 95000),
        )
        .await
        .unwrap();
    assert_eq!(created.variant_id, variant_id);
    assert_eq!(created.quantity, 5);
    assert_eq!(held(&fx, fx.general.id, created.id).await, 5);

    let reloaded = fx.db.catalog().get_product(fx.tenant.id, tree.product.id).await.unwrap();
    assert_eq!(reloaded.variants[0].lots.len(), 2);

    let other = product(&fx, "Beans", Currency::Lrd, vec![lot("BN-1", 1, date(2024, 1, 1), 50000)]).await;
    let err = fx
        .db
        .catalog()
        .restock(
            fx.tenant.id,
            other.product.id,
            variant_id,
            &lot("RC-3", 1, date(2024, 4, 1), 95000),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_identical_stock_under_a_new_name_is_rejected() {
    let fx = setup().await;
    let tree = product(&fx, "Soap", Currency::Usd, vec![lot("SP-1", 5, date(2024, 1, 1), 150)]).await;

    let request = |retail_cents: i64| CreateProductRequest {
        name: "Soap Bar".to_string(),
        category: "General".to_string(),
        unit: None,
        threshold_value: 0,
        currency: Currency::Usd,
        variants: vec![CreateVariantRequest {
            attributes: vec![AttributeInput::new("Kind", "Soap")],
            lots: vec![lot("SB-1", 5, date(2024, 1, 1), retail_cents)],
        }],
    };

    let err = fx
        .db
        .catalog()
        .create_product(fx.tenant.id, &request(150))
        .await
        .unwrap_err();
    match err.as_core() {
        Some(CoreError::DuplicateStock {
            attributes,
            variant_id,
        }) => {
            assert_eq!(attributes, "Kind=Soap");
            assert_eq!(*variant_id, tree.variants[0].variant.id);
        }
        other => panic!("expected DuplicateStock, got {:?}", other),
    }

    // A differently priced lot is new stock.
    let priced = fx
        .db
        .catalog()
        .create_product(fx.tenant.id, &request(175))
        .await
        .unwrap();
    assert_eq!(priced.variants[0].lots[0].retail_price(), Money::from_cents(175));
}

#[tokio::test]
async fn test_lot_patch_sets_and_clears_expiry() {
    let fx = setup().await;
    let tree = product(&fx, "Milk", Currency::Usd, vec![lot("MK-1", 3, date(2024, 1, 1), 250)]).await;
    let lot_id = lots_of(&tree)[0].id;

    let set = fx
        .db
        .catalog()
        .update_lot(
            fx.tenant.id,
            lot_id,
            &UpdateLotRequest {
                expired_date: Some(Some(date(2024, 2, 1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(set.expired_date, Some(date(2024, 2, 1)));

    let kept = fx
        .db
        .catalog()
        .update_lot(
            fx.tenant.id,
            lot_id,
            &UpdateLotRequest {
                lot_number: Some("MK-1A".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kept.expired_date, Some(date(2024, 2, 1)));

    let cleared = fx
        .db
        .catalog()
        .update_lot(
            fx.tenant.id,
            lot_id,
            &UpdateLotRequest {
                expired_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.expired_date, None);
    assert_eq!(cleared.quantity, 3);
}
