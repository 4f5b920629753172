//! Tenant isolation, topology setup and migrations.

mod common;

use common::*;
use ledger_core::{
    AttributeInput, CoreError, CreateProductRequest, CreateVariantRequest, Currency,
    WarehouseType,
};
use ledger_db::{migrations, DbError};

fn rice(name: &str, category: &str, kind: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        category: category.to_string(),
        unit: Some("bag".to_string()),
        threshold_value: 5,
        currency: Currency::Usd,
        variants: vec![CreateVariantRequest {
            attributes: vec![AttributeInput::new("Kind", kind)],
            lots: vec![lot("RC-1", 10, date(2024, 1, 1), 2500)],
        }],
    }
}

#[tokio::test]
async fn test_migrations_are_applied() {
    let fx = setup().await;
    let (total, applied) = migrations::migration_status(fx.db.pool()).await.unwrap();
    assert!(total > 0);
    assert_eq!(total, applied);
    assert!(fx.db.health_check().await);
}

#[tokio::test]
async fn test_topology_is_created_once() {
    let fx = setup().await;

    assert_eq!(fx.general.warehouse_type, WarehouseType::General);
    assert_eq!(fx.store_wh.warehouse_type, WarehouseType::Store);
    assert_eq!(fx.store_wh.store_id, Some(fx.store.id));
    assert_eq!(fx.store_wh.name, "Main Street Warehouse");

    let again = fx
        .db
        .warehouses()
        .get_or_create_general_warehouse(fx.tenant.id, "Another", None)
        .await
        .unwrap();
    assert_eq!(again.id, fx.general.id);

    let store_wh = fx
        .db
        .warehouses()
        .get_or_create_store_warehouse(fx.tenant.id, fx.store.id)
        .await
        .unwrap();
    assert_eq!(store_wh.id, fx.store_wh.id);

    let err = fx.db.tenants().create_tenant("Acme Retail").await.unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));
}

#[tokio::test]
async fn test_products_are_unique_per_tenant_ignoring_case() {
    let fx = setup().await;
    fx.db
        .catalog()
        .create_product(fx.tenant.id, &rice("Jasmine Rice", "Grocery", "Long"))
        .await
        .unwrap();

    let err = fx
        .db
        .catalog()
        .create_product(fx.tenant.id, &rice("jasmine rice", "GROCERY", "Short"))
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::DuplicateProduct { .. })));

    // Another tenant may use the same name.
    let other = fx.db.tenants().create_tenant("Beta Stores").await.unwrap();
    fx.db
        .warehouses()
        .get_or_create_general_warehouse(other.id, "Beta Central", None)
        .await
        .unwrap();
    let tree = fx
        .db
        .catalog()
        .create_product(other.id, &rice("Jasmine Rice", "Grocery", "Long"))
        .await
        .unwrap();
    assert_eq!(tree.product.tenant_id, other.id);
}

#[tokio::test]
async fn test_cross_tenant_references_are_rejected() {
    let fx = setup().await;
    let tree = product(&fx, "Cement", Currency::Usd, vec![lot("CM-1", 5, date(2024, 1, 1), 1200)]).await;
    allocate(&fx, &tree, 2).await;
    let sale = fx
        .db
        .sales()
        .process_sale(fx.tenant.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap()
        .sale;

    let other = fx.db.tenants().create_tenant("Beta Stores").await.unwrap();
    fx.db
        .exchange_rates()
        .add_rate(other.id, USD_RATE, date(2024, 1, 1))
        .await
        .unwrap();

    let err = fx.db.sales().get_sale(other.id, sale.id).await.unwrap_err();
    assert!(matches!(
        err.as_core(),
        Some(CoreError::TenantMismatch { entity, .. }) if entity == "Sale"
    ));

    let err = fx
        .db
        .sales()
        .process_sale(other.id, &sale_request(&fx, &[(tree.product.id, 1)], vec![]))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_core(),
        Some(CoreError::TenantMismatch { entity, .. }) if entity == "Store"
    ));

    let err = fx
        .db
        .inventory()
        .list_inventory(other.id, fx.store_wh.id)
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::TenantMismatch { .. })));

    let err = fx.db.sales().cancel_sale(other.id, sale.id, "intruder", None).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::TenantMismatch { .. })));
    let reloaded = fx.db.sales().get_sale(fx.tenant.id, sale.id).await.unwrap();
    assert_eq!(reloaded.details[0].cancelled_quantity, 0);
}
