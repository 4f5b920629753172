//! # Validation Module
//!
//! Top-down validation of ledger requests.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure)                                           │
//! │  ├── Shape: required fields, lengths, positive quantities              │
//! │  └── Whole request checked before any row is written                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository pre-checks (inside the transaction)               │
//! │  ├── Stock availability, tenant ownership, state machines              │
//! │  └── Duplicate product / duplicate stock                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite constraints                                           │
//! │  ├── CHECK (quantity >= 0), CHECK (refunded <= amount)                 │
//! │  └── UNIQUE (lot, warehouse, section), UNIQUE receipt_number           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::requests::{
    AttributeInput, CreateLotRequest, CreateProductRequest, CreateVariantRequest,
    InventoryItemRequest, LotChange, PaymentRequest, ProcessSaleRequest, ReturnItemRequest,
    UpdateLotRequest, UpdateProductRequest, VariantChange,
};
use crate::{MAX_BATCH_ITEMS, MAX_NAME_LENGTH, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, bounded text field.
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_text;
///
/// assert!(validate_text("name", "Rice 25kg", 255).is_ok());
/// assert!(validate_text("name", "   ", 255).is_err());
/// ```
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, MAX_NAME_LENGTH)
}

pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_text("category", category, 100)
}

/// Store codes must carry at least one letter or digit for receipt numbers.
pub fn validate_store_code(code: &str) -> ValidationResult<()> {
    validate_text("store code", code, 20)?;
    crate::codes::store_letter(code).map(|_| ())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a strictly positive quantity.
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Quantity in a cancellation or return request.
///
/// Non-positive values are an [`CoreError::InvalidQuantity`], not a plain
/// validation failure.
pub fn check_movement_quantity(entity: &str, qty: i64) -> CoreResult<()> {
    if qty <= 0 {
        return Err(CoreError::InvalidQuantity {
            entity: entity.to_string(),
            quantity: qty,
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Attribute names must be present and unique within a variant.
pub fn validate_attributes(attributes: &[AttributeInput]) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for attr in attributes {
        validate_text("attribute name", &attr.name, 100)?;
        validate_text("attribute value", &attr.value, MAX_NAME_LENGTH)?;
        if !seen.insert(attr.name.trim().to_lowercase()) {
            return Err(ValidationError::Duplicate {
                field: "attribute".to_string(),
                value: attr.name.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_lot(lot: &CreateLotRequest) -> ValidationResult<()> {
    validate_text("lot number", &lot.lot_number, 100)?;
    validate_non_negative("lot quantity", lot.quantity)?;
    validate_non_negative("purchase price", lot.purchase_price.cents())?;
    validate_non_negative("wholesale quantity", lot.wholesale_quantity)?;
    validate_non_negative("wholesale price", lot.wholesale_price.cents())?;
    validate_non_negative("retail price", lot.retail_price.cents())?;
    if let Some(expired) = lot.expired_date {
        if expired < lot.purchase_date {
            return Err(ValidationError::InvalidFormat {
                field: "expired date".to_string(),
                reason: "must not precede the purchase date".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_lot_update(patch: &UpdateLotRequest) -> ValidationResult<()> {
    if let Some(number) = &patch.lot_number {
        validate_text("lot number", number, 100)?;
    }
    if let Some(q) = patch.quantity {
        validate_non_negative("lot quantity", q)?;
    }
    for (field, value) in [
        ("purchase price", patch.purchase_price.map(|m| m.cents())),
        ("wholesale quantity", patch.wholesale_quantity),
        ("wholesale price", patch.wholesale_price.map(|m| m.cents())),
        ("retail price", patch.retail_price.map(|m| m.cents())),
    ] {
        if let Some(v) = value {
            validate_non_negative(field, v)?;
        }
    }
    Ok(())
}

pub fn validate_variant(variant: &CreateVariantRequest) -> ValidationResult<()> {
    validate_attributes(&variant.attributes)?;
    variant.lots.iter().try_for_each(validate_lot)
}

/// Canonical, order-independent key of an attribute set.
pub fn attribute_key(attributes: &[AttributeInput]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = attributes
        .iter()
        .map(|a| (a.name.trim().to_lowercase(), a.value.trim().to_lowercase()))
        .collect();
    key.sort();
    key
}

/// Validates a whole product tree before anything is written.
///
/// Two variants with the same attribute set in one request are rejected.
pub fn validate_create_product(req: &CreateProductRequest) -> ValidationResult<()> {
    validate_product_name(&req.name)?;
    validate_category(&req.category)?;
    if let Some(unit) = &req.unit {
        validate_text("unit", unit, 50)?;
    }
    validate_non_negative("threshold value", req.threshold_value)?;

    let mut sets = HashSet::new();
    for variant in &req.variants {
        validate_variant(variant)?;
        if !sets.insert(attribute_key(&variant.attributes)) {
            return Err(ValidationError::Duplicate {
                field: "variant attribute set".to_string(),
                value: describe_attributes(&variant.attributes),
            });
        }
    }
    Ok(())
}

pub fn validate_update_product(req: &UpdateProductRequest) -> ValidationResult<()> {
    if let Some(name) = &req.name {
        validate_product_name(name)?;
    }
    if let Some(category) = &req.category {
        validate_category(category)?;
    }
    if let Some(threshold) = req.threshold_value {
        validate_non_negative("threshold value", threshold)?;
    }
    for change in &req.variants {
        match change {
            VariantChange::Create(variant) => validate_variant(variant)?,
            VariantChange::Update {
                attributes, lots, ..
            } => {
                if let Some(attrs) = attributes {
                    validate_attributes(attrs)?;
                }
                for lot in lots {
                    match lot {
                        LotChange::Create(lot) => validate_lot(lot)?,
                        LotChange::Update { patch, .. } => validate_lot_update(patch)?,
                    }
                }
            }
        }
    }
    Ok(())
}

/// `Color=Black, Memory=128GB`.
pub fn describe_attributes(attributes: &[AttributeInput]) -> String {
    attributes
        .iter()
        .map(|a| format!("{}={}", a.name, a.value))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Movement & Sale Validators
// =============================================================================

fn validate_batch_size(len: usize) -> ValidationResult<()> {
    if len == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if len > MAX_BATCH_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_BATCH_ITEMS as i64,
        });
    }
    Ok(())
}

/// An add-inventory batch must be non-empty, bounded, and name each
/// (variant, lot) pair once.
pub fn validate_inventory_batch(items: &[InventoryItemRequest]) -> ValidationResult<()> {
    validate_batch_size(items.len())?;
    let mut keys = HashSet::new();
    for item in items {
        validate_quantity("quantity", item.quantity)?;
        if !keys.insert((item.variant_id, item.lot_id)) {
            return Err(ValidationError::Duplicate {
                field: "variant".to_string(),
                value: item.variant_id.to_string(),
            });
        }
    }
    Ok(())
}

/// A return batch must be non-empty, bounded, and name each lot once.
///
/// Quantities are checked by the ledger, which reports them as
/// [`CoreError::InvalidQuantity`].
pub fn validate_return_batch(items: &[ReturnItemRequest]) -> ValidationResult<()> {
    validate_batch_size(items.len())?;
    let mut lots = HashSet::new();
    for item in items {
        if !lots.insert(item.lot_id) {
            return Err(ValidationError::Duplicate {
                field: "lot".to_string(),
                value: item.lot_id.to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_payment(payment: &PaymentRequest) -> ValidationResult<()> {
    if !payment.amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    if let Some(reference) = &payment.reference {
        validate_text("payment reference", reference, 100)?;
    }
    Ok(())
}

pub fn validate_sale_request(req: &ProcessSaleRequest) -> ValidationResult<()> {
    validate_text("cashier", &req.cashier_id, 100)?;
    if req.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "products".to_string(),
        });
    }
    if req.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "products".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }
    let mut products = HashSet::new();
    for line in &req.lines {
        validate_quantity("quantity", line.quantity)?;
        if !products.insert(line.product_id) {
            return Err(ValidationError::Duplicate {
                field: "product".to_string(),
                value: line.product_id.to_string(),
            });
        }
    }
    req.payments.iter().try_for_each(validate_payment)
}

// =============================================================================
// Unit Tests
// =============================================================================
