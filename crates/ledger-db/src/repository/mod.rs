//! # Repository Module
//!
//! One repository per ledger area, plus the transaction helpers they share.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Every Mutating Operation                             │
//! │                                                                         │
//! │  validate request (ledger-core, pure)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx = pool.begin()                                                     │
//! │  lock_tenant(tx, tenant_id)   ← first statement: takes the write lock │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fetch_scoped::<T>(tx, id, tenant_id)  ← NotFound / TenantMismatch     │
//! │  pre-checks (availability, state machine)                              │
//! │  guarded writes: UPDATE ... WHERE quantity >= ?                        │
//! │       │                                                                 │
//! │       ├── any error → tx dropped → ROLLBACK                            │
//! │       ▼                                                                 │
//! │  tx.commit()                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`tenant::TenantRepository`] - Tenants and stores
//! - [`warehouse::WarehouseRepository`] - Warehouses and sections
//! - [`catalog::CatalogRepository`] - Products, variants, attributes, lots
//! - [`inventory::InventoryRepository`] - Inventory rows, allocation, returns
//! - [`movement::MovementRepository`] - Transfers and stock requests
//! - [`exchange_rate::ExchangeRateRepository`] - USD/LRD rates
//! - [`sale::SaleRepository`] - Sales, payments, refunds, cancellations
//! - [`report::ReportRepository`] - Lot-level sales reporting

pub mod catalog;
pub mod exchange_rate;
pub mod inventory;
pub mod movement;
pub mod report;
pub mod sale;
pub mod tenant;
pub mod warehouse;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection};

use crate::error::DbResult;
use ledger_core::{
    CoreError, Inventory, Lot, Payment, Product, Sale, SaleDetail, Section, StockRequest, Store,
    Transfer, Variant, Warehouse,
};

// =============================================================================
// Tenant Scoping
// =============================================================================

/// A row that belongs to exactly one tenant.
pub(crate) trait TenantScoped {
    /// Entity name used in error messages.
    const ENTITY: &'static str;
    const TABLE: &'static str;

    fn tenant_id(&self) -> i64;
}

macro_rules! tenant_scoped {
    ($($ty:ty => $entity:literal, $table:literal;)*) => {
        $(
            impl TenantScoped for $ty {
                const ENTITY: &'static str = $entity;
                const TABLE: &'static str = $table;

                fn tenant_id(&self) -> i64 {
                    self.tenant_id
                }
            }
        )*
    };
}

tenant_scoped! {
    Store => "Store", "stores";
    Warehouse => "Warehouse", "warehouses";
    Section => "Section", "sections";
    Product => "Product", "products";
    Variant => "Variant", "variants";
    Lot => "Lot", "lots";
    Inventory => "Inventory", "inventory";
    Transfer => "Transfer", "transfers";
    StockRequest => "StockRequest", "stock_requests";
    Sale => "Sale", "sales";
    SaleDetail => "SaleDetail", "sale_details";
    Payment => "Payment", "payments";
}

/// Loads a row by id and checks it belongs to `tenant_id`.
///
/// ## Returns
/// * `NotFound` - no row with that id
/// * `TenantMismatch` - the row belongs to another tenant
pub(crate) async fn fetch_scoped<T>(
    conn: &mut SqliteConnection,
    id: i64,
    tenant_id: i64,
) -> DbResult<T>
where
    T: TenantScoped + for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = ?1", T::TABLE);
    let row: Option<T> = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        None => Err(CoreError::not_found(T::ENTITY, id).into()),
        Some(row) if row.tenant_id() != tenant_id => {
            Err(CoreError::tenant_mismatch(T::ENTITY, id, tenant_id).into())
        }
        Some(row) => Ok(row),
    }
}

/// Takes the tenant's write lock for the rest of the transaction.
///
/// Must be the first statement of a mutating transaction: SQLite then
/// grants the database write lock up front (waiting up to `busy_timeout`),
/// so two writers of the same ledger never interleave their reads.
pub(crate) async fn lock_tenant(conn: &mut SqliteConnection, tenant_id: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE tenants SET updated_at = ?2 WHERE id = ?1")
        .bind(tenant_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::not_found("Tenant", tenant_id).into());
    }
    Ok(())
}
