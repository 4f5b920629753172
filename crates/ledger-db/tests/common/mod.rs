//! Shared fixtures for the ledger integration tests.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ledger_core::{
    AttributeInput, CreateLotRequest, CreateProductRequest, CreateVariantRequest, Currency,
    Inventory, InventoryItemRequest, Lot, Money, PaymentRequest, ProcessSaleRequest,
    ProductTree, SaleLineRequest, Store, Tenant, Warehouse,
};
use ledger_db::{Database, DbConfig};

/// 200.00 LRD per USD.
pub const USD_RATE: i64 = 20000;

pub struct Fixture {
    pub db: Database,
    pub tenant: Tenant,
    pub general: Warehouse,
    pub store: Store,
    pub store_wh: Warehouse,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A tenant with a general warehouse, one store and an exchange rate.
pub async fn setup() -> Fixture {
    setup_with(DbConfig::in_memory()).await
}

pub async fn setup_with(config: DbConfig) -> Fixture {
    let db = Database::new(config).await.unwrap();
    let tenant = db.tenants().create_tenant("Acme Retail").await.unwrap();
    let general = db
        .warehouses()
        .get_or_create_general_warehouse(tenant.id, "Central", None)
        .await
        .unwrap();
    db.exchange_rates()
        .add_rate(tenant.id, USD_RATE, date(2024, 1, 1))
        .await
        .unwrap();
    let (store, store_wh) = db
        .tenants()
        .create_store(tenant.id, "Main Street", "MAIN", None)
        .await
        .unwrap();

    Fixture {
        db,
        tenant,
        general,
        store,
        store_wh,
    }
}

pub fn lot(number: &str, quantity: i64, purchase_date: NaiveDate, retail_cents: i64) -> CreateLotRequest {
    CreateLotRequest {
        lot_number: number.to_string(),
        quantity,
        expired_date: None,
        purchase_price: Money::from_cents(retail_cents / 2),
        wholesale_quantity: 0,
        wholesale_price: Money::zero(),
        retail_price: Money::from_cents(retail_cents),
        purchase_date,
    }
}

/// A single-variant product whose attribute set is unique to its name.
pub async fn product(
    fx: &Fixture,
    name: &str,
    currency: Currency,
    lots: Vec<CreateLotRequest>,
) -> ProductTree {
    fx.db
        .catalog()
        .create_product(
            fx.tenant.id,
            &CreateProductRequest {
                name: name.to_string(),
                category: "General".to_string(),
                unit: None,
                threshold_value: 2,
                currency,
                variants: vec![CreateVariantRequest {
                    attributes: vec![AttributeInput::new("Kind", name)],
                    lots,
                }],
            },
        )
        .await
        .unwrap()
}

pub fn lots_of(tree: &ProductTree) -> Vec<Lot> {
    tree.variants[0].lots.clone()
}

/// Allocates `quantity` of the product's only variant to the fixture store.
pub async fn allocate(fx: &Fixture, tree: &ProductTree, quantity: i64) {
    fx.db
        .inventory()
        .add_inventory(
            fx.tenant.id,
            fx.store.id,
            &[InventoryItemRequest {
                product_id: tree.product.id,
                variant_id: tree.variants[0].variant.id,
                lot_id: None,
                quantity,
            }],
        )
        .await
        .unwrap();
}

/// Quantity of `lot_id` held in `warehouse_id` (0 when there is no row).
pub async fn held(fx: &Fixture, warehouse_id: i64, lot_id: i64) -> i64 {
    let rows: Vec<Inventory> = fx
        .db
        .inventory()
        .list_inventory(fx.tenant.id, warehouse_id)
        .await
        .unwrap();
    rows.iter()
        .filter(|r| r.lot_id == lot_id)
        .map(|r| r.quantity)
        .sum()
}

pub async fn lot_quantity(fx: &Fixture, lot_id: i64) -> i64 {
    fx.db.catalog().get_lot(fx.tenant.id, lot_id).await.unwrap().quantity
}

/// Noon UTC on 2024-06-01.
pub fn sale_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A USD sale at the fixture store on [`sale_time`].
pub fn sale_request(
    fx: &Fixture,
    lines: &[(i64, i64)],
    payments: Vec<PaymentRequest>,
) -> ProcessSaleRequest {
    ProcessSaleRequest {
        store_id: fx.store.id,
        cashier_id: "cashier-1".to_string(),
        currency: Currency::Usd,
        lines: lines
            .iter()
            .map(|&(product_id, quantity)| SaleLineRequest {
                product_id,
                quantity,
            })
            .collect(),
        payments,
        sale_date: Some(sale_time()),
    }
}
