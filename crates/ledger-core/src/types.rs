//! # Domain Types
//!
//! Persistent entities of the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Tenant ─┬─► Store ───────────► Warehouse(store) ─► Section             │
//! │          ├─► Warehouse(general) ──────────────────► Section             │
//! │          │                                                              │
//! │          ├─► Product ─► Variant ─┬─► Attribute                          │
//! │          │                       └─► Lot                                │
//! │          │                                                              │
//! │          ├─► Inventory (lot × warehouse × section) ◄── TransferLog     │
//! │          ├─► Transfer, StockRequest                                    │
//! │          ├─► ExchangeRate                                              │
//! │          └─► Sale ─┬─► SaleDetail (one per lot drawn)                  │
//! │                    ├─► Payment ─► Refund                               │
//! │                    └─► SaleCancellationLog                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an integer `id` assigned by the database and a
//! `tenant_id`. Business identifiers (`warehouse_code`, `sku`, `barcode`,
//! `receipt_number`) are generated once and never change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Enumerations
// =============================================================================

/// Currency a price, sale or payment is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US dollar.
    Usd,
    /// Liberian dollar.
    Lrd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Lrd => "LRD",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Lrd
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum WarehouseType {
    /// Tenant-wide stock pool. Exactly one per tenant.
    General,
    /// Bound 1:1 to a store.
    Store,
}

impl WarehouseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseType::General => "general",
            WarehouseType::Store => "store",
        }
    }
}

/// Direction of a logged stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    ToStore,
    ToGeneral,
}

impl TransferDirection {
    /// Direction implied by the destination warehouse type.
    pub fn towards(destination: WarehouseType) -> Self {
        match destination {
            WarehouseType::Store => TransferDirection::ToStore,
            WarehouseType::General => TransferDirection::ToGeneral,
        }
    }
}

/// Transfer state machine.
///
/// ```text
///            execute
///  pending ──────────► completed
///     │
///     │ cancel
///     ▼
///  cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

/// Stock request state machine: `pending → approved | rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum StockRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl StockRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockRequestStatus::Pending => "pending",
            StockRequestStatus::Approved => "approved",
            StockRequestStatus::Rejected => "rejected",
        }
    }
}

/// How a customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum PaymentMethod {
    /// Physical cash.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cash"))]
    Cash,
    /// Mobile money, confirmed at the counter.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Mobile_Money"))]
    #[serde(rename = "Mobile_Money")]
    MobileMoney,
    /// Orange money, settles asynchronously.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Orange_Money"))]
    #[serde(rename = "Orange_Money")]
    OrangeMoney,
    /// Card, settles asynchronously.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Visa_MasterCard"))]
    #[serde(rename = "Visa_MasterCard")]
    VisaMasterCard,
}

impl PaymentMethod {
    /// Status a freshly recorded payment of this method starts in.
    ///
    /// ```text
    /// Cash, Mobile_Money            → Completed
    /// Orange_Money, Visa_MasterCard → Processing
    /// ```
    pub fn initial_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cash | PaymentMethod::MobileMoney => PaymentStatus::Completed,
            PaymentMethod::OrangeMoney | PaymentMethod::VisaMasterCard => {
                PaymentStatus::Processing
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::MobileMoney => "Mobile_Money",
            PaymentMethod::OrangeMoney => "Orange_Money",
            PaymentMethod::VisaMasterCard => "Visa_MasterCard",
        }
    }
}

/// Status of a payment, and the aggregated status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum PaymentStatus {
    Completed,
    Processing,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }

    /// Failed or Cancelled.
    #[inline]
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Cancelled)
    }
}

/// What a cancellation log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CancellationKind {
    /// Whole sale cancelled by an operator.
    Full,
    /// Some quantity of some details cancelled.
    Partial,
    /// Every payment failed and the sale was reversed.
    PaymentFailed,
}

/// Stock level relative to a product's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    /// Computes the status of `quantity` against a low-stock `threshold`.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::types::StockStatus;
    ///
    /// assert_eq!(StockStatus::compute(0, 5), StockStatus::OutOfStock);
    /// assert_eq!(StockStatus::compute(5, 5), StockStatus::LowStock);
    /// assert_eq!(StockStatus::compute(6, 5), StockStatus::InStock);
    /// ```
    pub fn compute(quantity: i64, threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

// =============================================================================
// Tenancy & Topology
// =============================================================================

/// Isolation boundary. Every other entity carries a `tenant_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A retail outlet. Owns exactly one store warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Store {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// Short code; its first alphanumeric character goes into receipt numbers.
    pub code: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stock location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub tenant_id: i64,
    /// Sequential per tenant: `WH-001`, `WH-002`, ...
    pub warehouse_code: String,
    pub name: String,
    pub location: Option<String>,
    pub warehouse_type: WarehouseType,
    /// Set iff `warehouse_type == Store`.
    pub store_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A subdivision of a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Section {
    pub id: i64,
    pub tenant_id: i64,
    pub warehouse_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub category: String,
    pub unit: Option<String>,
    /// Low-stock cutoff used by [`StockStatus::compute`].
    pub threshold_value: i64,
    /// Currency all lot prices of this product are expressed in.
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A concrete form of a product, identified by its attribute set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Variant {
    pub id: i64,
    pub tenant_id: i64,
    pub product_id: i64,
    pub sku: String,
    pub barcode: String,
    pub created_at: DateTime<Utc>,
}

/// A named attribute of a variant (`Color = Black`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Attribute {
    pub id: i64,
    pub variant_id: i64,
    pub name: String,
    pub value: String,
}

/// One priced, dated batch of a variant.
///
/// `quantity` mirrors the lot's inventory row in the general warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Lot {
    pub id: i64,
    pub tenant_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_number: String,
    pub quantity: i64,
    pub expired_date: Option<NaiveDate>,
    pub purchase_price_cents: i64,
    pub wholesale_quantity: i64,
    pub wholesale_price_cents: i64,
    pub retail_price_cents: i64,
    pub purchase_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    #[inline]
    pub fn retail_price(&self) -> Money {
        Money::from_cents(self.retail_price_cents)
    }

    /// A lot is expired on a date strictly after its expiry date.
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expired_date.map(|d| d < date).unwrap_or(false)
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Units of one lot sitting in one section of one warehouse.
///
/// At most one row per `(lot, warehouse, section)`; rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Inventory {
    pub id: i64,
    pub tenant_id: i64,
    pub warehouse_id: i64,
    pub section_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit row for one quantity movement between inventory rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferLog {
    pub id: i64,
    pub tenant_id: i64,
    pub source_inventory_id: Option<i64>,
    pub destination_inventory_id: Option<i64>,
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
    pub quantity: i64,
    pub direction: TransferDirection,
    pub transferred_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// A planned move of a product between two warehouses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transfer {
    pub id: i64,
    pub tenant_id: i64,
    pub product_id: i64,
    pub source_warehouse_id: i64,
    pub destination_warehouse_id: i64,
    pub quantity: i64,
    pub status: TransferStatus,
    pub confirmed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A store's request for the stock it is short of.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRequest {
    pub id: i64,
    pub tenant_id: i64,
    pub store_id: i64,
    pub warehouse_from_id: i64,
    pub warehouse_to_id: i64,
    pub product_id: i64,
    pub lot_id: Option<i64>,
    pub quantity_requested: i64,
    pub status: StockRequestStatus,
    /// Transfer created on approval.
    pub transfer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a stock request submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StockRequestOutcome {
    /// The store already holds enough; nothing was persisted.
    Sufficient { available: i64 },
    /// A request for exactly the shortfall was persisted.
    Requested { request: StockRequest },
}

// =============================================================================
// Settlement
// =============================================================================

/// LRD per one USD, effective from a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExchangeRate {
    pub id: i64,
    pub tenant_id: i64,
    /// LRD per USD in hundredths: 200.00 is stored as 20000.
    pub usd_rate: i64,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A point-of-sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub tenant_id: i64,
    pub store_id: i64,
    /// Opaque actor reference.
    pub cashier_id: String,
    pub receipt_number: String,
    pub sale_date: DateTime<Utc>,
    /// Settlement currency of `grand_total`.
    pub currency: Currency,
    /// Frozen at creation, never recomputed.
    pub exchange_rate_used: i64,
    pub total_usd_cents: i64,
    pub total_lrd_cents: i64,
    pub grand_total_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_due_cents: i64,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.balance_due_cents)
    }

    /// Cancelled or Failed sales accept no further changes.
    pub fn is_closed(&self) -> bool {
        self.payment_status.is_terminal_failure()
    }
}

/// One lot's share of one product line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleDetail {
    pub id: i64,
    pub tenant_id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
    /// Store inventory row the units were drawn from.
    pub inventory_id: i64,
    pub quantity_sold: i64,
    pub cancelled_quantity: i64,
    pub price_at_sale_cents: i64,
    pub currency: Currency,
}

impl SaleDetail {
    /// `quantity_sold - cancelled_quantity`.
    #[inline]
    pub fn active_quantity(&self) -> i64 {
        self.quantity_sold - self.cancelled_quantity
    }

    /// Price times active quantity.
    #[inline]
    pub fn active_total(&self) -> Money {
        Money::from_cents(self.price_at_sale_cents).multiply_quantity(self.active_quantity())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: i64,
    pub tenant_id: i64,
    pub sale_id: i64,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub currency: Currency,
    /// Always `<= amount_cents`.
    pub refunded_amount_cents: i64,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Amount not yet refunded.
    #[inline]
    pub fn unrefunded(&self) -> Money {
        Money::from_cents(self.amount_cents - self.refunded_amount_cents)
    }
}

/// Money returned against one payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Refund {
    pub id: i64,
    pub tenant_id: i64,
    pub payment_id: i64,
    pub sale_id: i64,
    /// In the payment's currency.
    pub amount_cents: i64,
    pub currency: Currency,
    pub processed_by: String,
    pub reason: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Audit entry for a cancellation or a payment-failure reversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleCancellationLog {
    pub id: i64,
    pub tenant_id: i64,
    pub sale_id: i64,
    pub kind: CancellationKind,
    pub cancelled_by: String,
    pub reason: Option<String>,
    /// Sum of refunds issued, in sale currency.
    pub refund_total_cents: i64,
    /// JSON array of [`ReversalEntry`].
    pub summary: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Per-detail line of a cancellation summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalEntry {
    pub sale_detail_id: i64,
    pub product_id: i64,
    pub lot_id: i64,
    pub quantity: i64,
}

/// A sale with everything hanging off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithDetails {
    pub sale: Sale,
    pub details: Vec<SaleDetail>,
    pub payments: Vec<Payment>,
    pub refunds: Vec<Refund>,
}

// =============================================================================
// Read Models
// =============================================================================

/// One lot's worth of a completed movement between two inventory rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
    pub quantity: i64,
    pub source_inventory_id: i64,
    pub destination_inventory_id: i64,
    pub transfer_log_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantTree {
    pub variant: Variant,
    pub attributes: Vec<Attribute>,
    pub lots: Vec<Lot>,
}

/// A product with its variants, attributes and lots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTree {
    pub product: Product,
    pub variants: Vec<VariantTree>,
}

/// Per-product stock in one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub threshold_value: i64,
    pub status: StockStatus,
}

/// One row of the lot-level sales report.
///
/// Grouped by store, product, lot, day and line currency. Quantities and
/// revenue exclude cancelled units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LotSalesRow {
    pub store_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub lot_id: i64,
    pub lot_number: String,
    pub sale_day: String,
    pub currency: Currency,
    pub quantity: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(PaymentMethod::Cash.initial_status(), PaymentStatus::Completed);
        assert_eq!(
            PaymentMethod::MobileMoney.initial_status(),
            PaymentStatus::Completed
        );
        assert_eq!(
            PaymentMethod::OrangeMoney.initial_status(),
            PaymentStatus::Processing
        );
        assert_eq!(
            PaymentMethod::VisaMasterCard.initial_status(),
            PaymentStatus::Processing
        );
    }

    #[test]
    fn test_payment_method_serde_names() {
        let json = serde_json::to_string(&PaymentMethod::VisaMasterCard).unwrap();
        assert_eq!(json, "\"Visa_MasterCard\"");
        let parsed: PaymentMethod = serde_json::from_str("\"Orange_Money\"").unwrap();
        assert_eq!(parsed, PaymentMethod::OrangeMoney);
    }

    #[test]
    fn test_currency_serde() {
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
        assert_eq!(Currency::default(), Currency::Lrd);
    }

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::compute(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::compute(1, 0), StockStatus::InStock);
        assert_eq!(StockStatus::compute(3, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::LowStock.as_str(), "Low Stock");
    }

    #[test]
    fn test_transfer_direction_towards() {
        assert_eq!(
            TransferDirection::towards(WarehouseType::Store),
            TransferDirection::ToStore
        );
        assert_eq!(
            TransferDirection::towards(WarehouseType::General),
            TransferDirection::ToGeneral
        );
    }

    #[test]
    fn test_lot_expiry_is_strict() {
        let now = Utc::now();
        let lot = Lot {
            id: 1,
            tenant_id: 1,
            product_id: 1,
            variant_id: 1,
            lot_number: "L1".into(),
            quantity: 5,
            expired_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            purchase_price_cents: 0,
            wholesale_quantity: 0,
            wholesale_price_cents: 0,
            retail_price_cents: 1000,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            created_at: now,
            updated_at: now,
        };
        assert!(!lot.is_expired_on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        assert!(lot.is_expired_on(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()));
    }

    #[test]
    fn test_sale_detail_active_total() {
        let detail = SaleDetail {
            id: 1,
            tenant_id: 1,
            sale_id: 1,
            product_id: 1,
            variant_id: 1,
            lot_id: 1,
            inventory_id: 1,
            quantity_sold: 3,
            cancelled_quantity: 1,
            price_at_sale_cents: 1000,
            currency: Currency::Usd,
        };
        assert_eq!(detail.active_quantity(), 2);
        assert_eq!(detail.active_total().cents(), 2000);
    }
}
