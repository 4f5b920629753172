//! # Request Types
//!
//! Inputs to ledger operations. Each is a plain tagged structure validated
//! top-down (see [`crate::validation`]) before anything is persisted.
//!
//! ## Catalog Write Shape
//! ```text
//! CreateProductRequest
//!   └── variants: [CreateVariantRequest]
//!         ├── attributes: [AttributeInput]
//!         └── lots:       [CreateLotRequest]
//!
//! UpdateProductRequest
//!   └── variants: [VariantChange]
//!         ├── Create(CreateVariantRequest)
//!         └── Update { id, attributes?, lots: [LotChange] }
//!                                               ├── Create(CreateLotRequest)
//!                                               └── Update { id, patch }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::money::Money;
use crate::types::{Currency, PaymentMethod, PaymentStatus};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInput {
    pub name: String,
    pub value: String,
}

impl AttributeInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLotRequest {
    pub lot_number: String,
    pub quantity: i64,
    pub expired_date: Option<NaiveDate>,
    pub purchase_price: Money,
    #[serde(default)]
    pub wholesale_quantity: i64,
    pub wholesale_price: Money,
    pub retail_price: Money,
    pub purchase_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVariantRequest {
    pub attributes: Vec<AttributeInput>,
    pub lots: Vec<CreateLotRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub unit: Option<String>,
    #[serde(default)]
    pub threshold_value: i64,
    #[serde(default)]
    pub currency: Currency,
    pub variants: Vec<CreateVariantRequest>,
}

/// Partial edit of an existing lot. `None` keeps the stored value.
///
/// A quantity change is mirrored into the lot's general-warehouse inventory
/// and is rejected once the lot has been distributed to stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLotRequest {
    pub lot_number: Option<String>,
    pub quantity: Option<i64>,
    /// `Some(None)` clears the expiry date; `None` keeps it.
    #[serde(default, deserialize_with = "present")]
    pub expired_date: Option<Option<NaiveDate>>,
    pub purchase_price: Option<Money>,
    pub wholesale_quantity: Option<i64>,
    pub wholesale_price: Option<Money>,
    pub retail_price: Option<Money>,
    pub purchase_date: Option<NaiveDate>,
}

/// Maps a present field to `Some`, so an explicit `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LotChange {
    Create(CreateLotRequest),
    Update { id: i64, patch: UpdateLotRequest },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VariantChange {
    Create(CreateVariantRequest),
    Update {
        id: i64,
        /// Replaces the whole attribute set when present.
        attributes: Option<Vec<AttributeInput>>,
        #[serde(default)]
        lots: Vec<LotChange>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub threshold_value: Option<i64>,
    pub currency: Option<Currency>,
    #[serde(default)]
    pub variants: Vec<VariantChange>,
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// One line of an add-inventory batch.
///
/// Without a lot, the quantity is drawn FIFO across the variant's lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItemRequest {
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: Option<i64>,
    pub quantity: i64,
}

/// One line of a return-inventory batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItemRequest {
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub product_id: i64,
    pub source_warehouse_id: i64,
    pub destination_warehouse_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateStockRequest {
    pub store_id: i64,
    pub product_id: i64,
    /// Limits the sufficiency check to one lot when present.
    pub lot_id: Option<i64>,
    pub quantity: i64,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub amount: Money,
    pub currency: Currency,
    pub reference: Option<String>,
}

impl PaymentRequest {
    pub fn new(method: PaymentMethod, amount: Money, currency: Currency) -> Self {
        Self {
            method,
            amount,
            currency,
            reference: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSaleRequest {
    pub store_id: i64,
    pub cashier_id: String,
    pub currency: Currency,
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub payments: Vec<PaymentRequest>,
    /// Defaults to now. Lots expired before this date are skipped.
    pub sale_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CancelItemRequest {
    pub sale_detail_id: i64,
    pub quantity: i64,
}

/// Asynchronous settlement result for a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_id: i64,
    pub status: PaymentStatus,
    pub reference: Option<String>,
}

// =============================================================================
// Reporting
// =============================================================================

/// Filters for the lot-level sales report. All optional; dates inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub store_id: Option<i64>,
    pub currency: Option<Currency>,
    pub cashier_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}
