//! Sale processing, payments, cancellations and the lot sales report.

mod common;

use common::*;
use ledger_core::{
    CancelItemRequest, CancellationKind, CoreError, CreateLotRequest, Currency,
    InventoryItemRequest, Money, PaymentMethod, PaymentRequest, PaymentStatus,
    PaymentStatusUpdate, ProcessSaleRequest, ReversalEntry, SalesReportFilter,
};
use ledger_db::DbError;

fn cash(cents: i64) -> PaymentRequest {
    PaymentRequest::new(PaymentMethod::Cash, Money::from_cents(cents), Currency::Usd)
}

#[tokio::test]
async fn test_mixed_currency_sale_grand_total() {
    let fx = setup().await;
    let a = product(&fx, "Notebook", Currency::Usd, vec![lot("N-1", 5, date(2024, 1, 1), 1000)]).await;
    let b = product(&fx, "Cassava", Currency::Lrd, vec![lot("C-1", 5, date(2024, 1, 1), 200000)]).await;
    allocate(&fx, &a, 1).await;
    allocate(&fx, &b, 1).await;

    let sale = fx
        .db
        .sales()
        .process_sale(
            fx.tenant.id,
            &sale_request(&fx, &[(a.product.id, 1), (b.product.id, 1)], vec![]),
        )
        .await
        .unwrap()
        .sale;

    assert_eq!(sale.total_usd_cents, 1000);
    assert_eq!(sale.total_lrd_cents, 200000);
    assert_eq!(sale.grand_total_cents, 2000);
    assert_eq!(sale.balance_due_cents, 2000);
    assert_eq!(sale.exchange_rate_used, USD_RATE);
    assert_eq!(sale.payment_status, PaymentStatus::Processing);
}

#[tokio::test]
async fn test_sale_draws_fifo_and_skips_expired_lots() {
    let fx = setup().await;
    let expired = CreateLotRequest {
        expired_date: Some(date(2024, 3, 1)),
        ..lot("M-EXP", 4, date(2023, 12, 1), 700)
    };
    let tree = product(
        &fx,
        "Milk",
        Currency::Usd,
        vec![
            expired,
            lot("M-1", 5, date(2024, 1, 1), 700),
            lot("M-2", 5, date(2024, 2, 1), 800),
        ],
    )
    .await;
    allocate(&fx, &tree, 14).await;
    let lots = lots_of(&tree);
    let (exp, first, second) = (&lots[0], &lots[1], &lots[2]);

    let full = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 7)], vec![]))
        .await
        .unwrap();

    let drawn: Vec<(i64, i64)> = full.details.iter().map(|d| (d.lot_id, d.quantity_sold)).collect();
    assert_eq!(drawn, vec![(first.id, 5), (second.id, 2)]);
    // Priced at the most recently purchased lot.
    assert!(full.details.iter().all(|d| d.price_at_sale_cents == 800));
    assert_eq!(full.sale.grand_total_cents, 5600);

    assert_eq!(held(&fx, fx.store_wh.id, exp.id).await, 4);
    assert_eq!(held(&fx, fx.store_wh.id, first.id).await, 0);
    assert_eq!(held(&fx, fx.store_wh.id, second.id).await, 3);
}

#[tokio::test]
async fn test_short_sale_writes_nothing() {
    let fx = setup().await;
    let tree = product(&fx, "Bread", Currency::Usd, vec![lot("BR-1", 5, date(2024, 1, 1), 250)]).await;
    allocate(&fx, &tree, 3).await;
    let lot_id = lots_of(&tree)[0].id;

    let err = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 4)], vec![cash(100)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::InsufficientStock {
            requested: 4,
            available: 3,
            ..
        })
    ));
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 3);
    assert!(fx.db.sales().list_sales(fx.tenant.id, None).await.unwrap().is_empty());

    // The rolled-back sale did not consume a receipt number.
    let sale = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap()
        .sale;
    assert_eq!(sale.receipt_number, format!("T{}SM2024-0001", fx.tenant.id));
}

#[tokio::test]
async fn test_receipt_numbers_increase_per_store_and_year() {
    let fx = setup().await;
    let tree = product(&fx, "Pens", Currency::Usd, vec![lot("P-1", 10, date(2024, 1, 1), 50)]).await;
    allocate(&fx, &tree, 10).await;

    let mut receipts = Vec::new();
    for _ in 0..3 {
        let sale = fx
            .db
            .sales()
            .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
            .await
            .unwrap()
            .sale;
        receipts.push(sale.receipt_number);
    }

    let t = fx.tenant.id;
    assert_eq!(
        receipts,
        vec![
            format!("T{}SM2024-0001", t),
            format!("T{}SM2024-0002", t),
            format!("T{}SM2024-0003", t),
        ]
    );
}

#[tokio::test]
async fn test_payments_convert_at_frozen_rate_and_never_overpay() {
    let fx = setup().await;
    let tree = product(&fx, "Lamp", Currency::Usd, vec![lot("L-1", 2, date(2024, 1, 1), 1000)]).await;
    allocate(&fx, &tree, 1).await;

    let sale = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap()
        .sale;

    // A newer rate must not affect the existing sale.
    fx.db
        .exchange_rates()
        .add_rate(fx.tenant.id, 10000, date(2024, 5, 1))
        .await
        .unwrap();

    let err = fx
        .db
        .sales()
        .add_payment(fx.tenant.id, sale.id, &cash(1500))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_core(),
        Some(CoreError::Overpayment {
            balance_due: 1000,
            attempted: 1500,
            ..
        })
    ));

    let lrd = PaymentRequest::new(PaymentMethod::Cash, Money::from_cents(200000), Currency::Lrd);
    let (payment, sale) = fx.db.sales().add_payment(fx.tenant.id, sale.id, &lrd).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(sale.amount_paid_cents, 1000);
    assert_eq!(sale.balance_due_cents, 0);
    assert_eq!(sale.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_partial_cancel_recomputes_and_refunds_overpayment() {
    let fx = setup().await;
    let shirt = product(&fx, "Shirt", Currency::Usd, vec![lot("SH-1", 5, date(2024, 1, 1), 1000)]).await;
    let socks = product(&fx, "Socks", Currency::Usd, vec![lot("SO-1", 5, date(2024, 1, 1), 500)]).await;
    allocate(&fx, &shirt, 3).await;
    allocate(&fx, &socks, 2).await;

    let full = fx
        .db
        .sales()
        .process_sale(
            fx.tenant.id,
            &sale_request(&fx, &[(shirt.product.id, 3), (socks.product.id, 2)], vec![cash(4000)]),
        )
        .await
        .unwrap();
    assert_eq!(full.sale.grand_total_cents, 4000);
    assert_eq!(full.sale.payment_status, PaymentStatus::Completed);

    let shirt_detail = full
        .details
        .iter()
        .find(|d| d.product_id == shirt.product.id)
        .unwrap()
        .clone();

    let (after, log) = fx
        .db
        .sales()
        .partial_cancel(
            fx.tenant.id,
            full.sale.id,
            &[CancelItemRequest {
                sale_detail_id: shirt_detail.id,
                quantity: 1,
            }],
            "manager-1",
            Some("customer changed mind"),
        )
        .await
        .unwrap();

    assert_eq!(after.sale.grand_total_cents, 3000);
    assert_eq!(after.sale.amount_paid_cents, 3000);
    assert_eq!(after.sale.balance_due_cents, 0);
    assert_eq!(after.refunds.len(), 1);
    assert_eq!(after.refunds[0].amount_cents, 1000);
    assert_eq!(after.payments[0].refunded_amount_cents, 1000);

    assert_eq!(held(&fx, fx.store_wh.id, shirt_detail.lot_id).await, 1);

    assert_eq!(log.kind, CancellationKind::Partial);
    assert_eq!(log.refund_total_cents, 1000);
    let summary: Vec<ReversalEntry> = serde_json::from_str(&log.summary).unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].quantity, 1);

    let err = fx
        .db
        .sales()
        .partial_cancel(
            fx.tenant.id,
            full.sale.id,
            &[CancelItemRequest {
                sale_detail_id: shirt_detail.id,
                quantity: 3,
            }],
            "manager-1",
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidQuantity { quantity: 3, .. })));
}

#[tokio::test]
async fn test_full_cancel_refunds_every_payment_exactly() {
    let fx = setup().await;
    let tree = product(&fx, "Radio", Currency::Usd, vec![lot("RD-1", 2, date(2024, 1, 1), 10000)]).await;
    allocate(&fx, &tree, 1).await;
    let lot_id = lots_of(&tree)[0].id;

    let mobile = PaymentRequest::new(PaymentMethod::MobileMoney, Money::from_cents(4500), Currency::Usd);
    let full = fx
        .db
        .sales()
        .process_sale(
            fx.tenant.id,
            &sale_request(&fx, &[(tree.product.id, 1)], vec![cash(3000), mobile, cash(2500)]),
        )
        .await
        .unwrap();
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 0);

    let (cancelled, log) = fx
        .db
        .sales()
        .cancel_sale(fx.tenant.id, full.sale.id, "manager-1", None)
        .await
        .unwrap();

    let refunded: Vec<i64> = cancelled.refunds.iter().map(|r| r.amount_cents).collect();
    assert_eq!(refunded, vec![3000, 4500, 2500]);
    assert_eq!(log.refund_total_cents, 10000);
    assert_eq!(log.kind, CancellationKind::Full);
    assert!(cancelled
        .payments
        .iter()
        .all(|p| p.refunded_amount_cents == p.amount_cents));
    assert_eq!(cancelled.sale.payment_status, PaymentStatus::Cancelled);
    assert_eq!(cancelled.sale.amount_paid_cents, 0);
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 1);

    let err = fx
        .db
        .sales()
        .cancel_sale(fx.tenant.id, full.sale.id, "manager-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidState { .. })));
}

#[tokio::test]
async fn test_failed_card_payment_reverses_sale() {
    let fx = setup().await;
    let tree = product(&fx, "Fan", Currency::Usd, vec![lot("FN-1", 3, date(2024, 1, 1), 2500)]).await;
    allocate(&fx, &tree, 2).await;
    let lot_id = lots_of(&tree)[0].id;

    let card = PaymentRequest::new(PaymentMethod::VisaMasterCard, Money::from_cents(5000), Currency::Usd);
    let full = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 2)], vec![card]))
        .await
        .unwrap();
    assert_eq!(full.payments[0].status, PaymentStatus::Processing);
    assert_eq!(full.sale.payment_status, PaymentStatus::Processing);
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 0);

    let sale = fx
        .db
        .sales()
        .update_payment_status(
            fx.tenant.id,
            &PaymentStatusUpdate {
                payment_id: full.payments[0].id,
                status: PaymentStatus::Failed,
                reference: Some("declined".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(sale.payment_status, PaymentStatus::Failed);
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 2);

    let logs = fx.db.sales().cancellation_logs(fx.tenant.id, sale.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].kind, CancellationKind::PaymentFailed);

    let err = fx
        .db
        .sales()
        .update_payment_status(
            fx.tenant.id,
            &PaymentStatusUpdate {
                payment_id: full.payments[0].id,
                status: PaymentStatus::Completed,
                reference: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidState { .. })));
}

#[tokio::test]
async fn test_settled_orange_money_completes_sale() {
    let fx = setup().await;
    let tree = product(&fx, "Kettle", Currency::Usd, vec![lot("K-1", 1, date(2024, 1, 1), 1800)]).await;
    allocate(&fx, &tree, 1).await;

    let orange = PaymentRequest::new(PaymentMethod::OrangeMoney, Money::from_cents(1800), Currency::Usd);
    let full = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![orange]))
        .await
        .unwrap();

    let sale = fx
        .db
        .sales()
        .update_payment_status(
            fx.tenant.id,
            &PaymentStatusUpdate {
                payment_id: full.payments[0].id,
                status: PaymentStatus::Completed,
                reference: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(sale.payment_status, PaymentStatus::Completed);
    assert_eq!(sale.balance_due_cents, 0);
}

#[tokio::test]
async fn test_sale_without_rate_is_configuration_error() {
    let fx = setup().await;
    let other = fx.db.tenants().create_tenant("No Rates Ltd").await.unwrap();
    let (store, _) = fx
        .db
        .tenants()
        .create_store(other.id, "Kiosk", "K1", None)
        .await
        .unwrap();

    let mut req = sale_request(&fx, &[(1, 1)], vec![]);
    req.store_id = store.id;
    let err = fx.db.sales().process_sale(other.id, &req).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::Configuration(_))));
}

#[tokio::test]
async fn test_lot_sales_report_counts_active_units() {
    let fx = setup().await;
    let tree = product(&fx, "Candle", Currency::Usd, vec![lot("CD-1", 5, date(2024, 1, 1), 300)]).await;
    allocate(&fx, &tree, 5).await;

    let full = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 3)], vec![]))
        .await
        .unwrap();
    fx.db
        .sales()
        .partial_cancel(
            fx.tenant.id,
            full.sale.id,
            &[CancelItemRequest {
                sale_detail_id: full.details[0].id,
                quantity: 1,
            }],
            "manager-1",
            None,
        )
        .await
        .unwrap();

    let report = fx
        .db
        .reports()
        .lot_sales_report(
            fx.tenant.id,
            &SalesReportFilter {
                from: Some(date(2024, 6, 1)),
                to: Some(date(2024, 6, 30)),
                store_id: Some(fx.store.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].sale_day, "2024-06-01");
    assert_eq!(report[0].quantity, 2);
    assert_eq!(report[0].revenue_cents, 600);
    assert_eq!(report[0].lot_number, "CD-1");

    let lrd_only = fx
        .db
        .reports()
        .lot_sales_report(
            fx.tenant.id,
            &SalesReportFilter {
                currency: Some(Currency::Lrd),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(lrd_only.is_empty());
}

#[tokio::test]
async fn test_stores_sharing_a_letter_keep_separate_receipts() {
    let fx = setup().await;
    let (mall, _) = fx
        .db
        .tenants()
        .create_store(fx.tenant.id, "Mall Kiosk", "MALL", None)
        .await
        .unwrap();
    let tree = product(&fx, "Lamp", Currency::Usd, vec![lot("LP-1", 10, date(2024, 1, 1), 1500)]).await;
    allocate(&fx, &tree, 2).await;
    fx.db
        .inventory()
        .add_inventory(
            fx.tenant.id,
            mall.id,
            &[InventoryItemRequest {
                product_id: tree.product.id,
                variant_id: tree.variants[0].variant.id,
                lot_id: None,
                quantity: 2,
            }],
        )
        .await
        .unwrap();

    let main_sale = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap()
        .sale;
    let mall_sale = fx
        .db
        .sales()
        .process_sale(
            fx.tenant.id,
            &ProcessSaleRequest {
                store_id: mall.id,
                ..sale_request(&fx, &[(tree.product.id, 1)], vec![])
            },
        )
        .await
        .unwrap()
        .sale;

    let first = format!("T{}SM2024-0001", fx.tenant.id);
    assert_eq!(main_sale.receipt_number, first);
    assert_eq!(mall_sale.receipt_number, first);
    assert_eq!(mall_sale.store_id, mall.id);

    let again = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap()
        .sale;
    assert_eq!(again.receipt_number, format!("T{}SM2024-0002", fx.tenant.id));
}

#[tokio::test]
async fn test_partial_cancel_never_refunds_unsettled_payments() {
    let fx = setup().await;
    let tree = product(&fx, "Kettle", Currency::Usd, vec![lot("KT-1", 4, date(2024, 1, 1), 1000)]).await;
    allocate(&fx, &tree, 4).await;

    let visa = PaymentRequest::new(PaymentMethod::VisaMasterCard, Money::from_cents(2000), Currency::Usd);
    let full = fx
        .db
        .sales()
        .process_sale(
            fx.tenant.id,
            &sale_request(&fx, &[(tree.product.id, 4)], vec![cash(2000), visa]),
        )
        .await
        .unwrap();
    assert_eq!(full.sale.grand_total_cents, 4000);
    assert_eq!(full.sale.payment_status, PaymentStatus::Processing);

    let (after, log) = fx
        .db
        .sales()
        .partial_cancel(
            fx.tenant.id,
            full.sale.id,
            &[CancelItemRequest {
                sale_detail_id: full.details[0].id,
                quantity: 1,
            }],
            "manager-1",
            None,
        )
        .await
        .unwrap();

    // Only 2000 has been collected against a 3000 total.
    assert_eq!(after.sale.grand_total_cents, 3000);
    assert!(after.refunds.is_empty());
    assert_eq!(log.refund_total_cents, 0);
    assert!(after.payments.iter().all(|p| p.refunded_amount_cents == 0));

    let card = after
        .payments
        .iter()
        .find(|p| p.method == PaymentMethod::VisaMasterCard)
        .unwrap();
    let sale = fx
        .db
        .sales()
        .update_payment_status(
            fx.tenant.id,
            &PaymentStatusUpdate {
                payment_id: card.id,
                status: PaymentStatus::Failed,
                reference: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(sale.amount_paid_cents, 2000);
    assert_eq!(sale.balance_due_cents, 1000);
}
