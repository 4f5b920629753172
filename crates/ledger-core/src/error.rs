//! # Error Types
//!
//! Domain-specific error types for ledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ledger-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger and settlement rule violations          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ledger-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, id, requested, available)
//! 3. Errors are enum variants, never String
//! 4. Nothing here is retried by the ledger; retries are the caller's call

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger and settlement errors.
///
/// Every variant aborts the operation that raised it. The database layer
/// drops the surrounding transaction, so no partial write survives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds what is available.
    ///
    /// ## When This Occurs
    /// - Store allocation larger than the general warehouse holds for a lot
    /// - Sale larger than non-expired store stock for a product
    /// - Return larger than the store holds for a lot
    ///
    /// ```text
    /// add-inventory (qty: 6)
    ///      │
    ///      ▼
    /// general inventory: 5
    ///      │
    ///      ▼
    /// InsufficientStock { entity: "lot 12", requested: 6, available: 5 }
    /// ```
    #[error("Insufficient stock for {entity}: requested {requested}, available {available}")]
    InsufficientStock {
        entity: String,
        requested: i64,
        available: i64,
    },

    /// A change would drive an inventory row below zero.
    ///
    /// Raised by lot synchronisation. The write is blocked, never clamped.
    #[error("Inventory {inventory} would become negative: current {current}, delta {delta}")]
    NegativeInventory {
        inventory: String,
        current: i64,
        delta: i64,
    },

    /// Operation attempted from a state that forbids it.
    ///
    /// ## When This Occurs
    /// - Executing a transfer that is not pending
    /// - Cancelling a sale that is already cancelled
    /// - Editing the quantity of a lot whose stock has been distributed
    #[error("{entity} {id} is {state}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
        operation: String,
    },

    /// Required topology or reference data is missing.
    ///
    /// No general warehouse, no store warehouse, no exchange rate.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A payment would push the amount paid past the grand total.
    #[error("Payment of {attempted} exceeds balance due {balance_due} on sale {sale_id}")]
    Overpayment {
        sale_id: i64,
        balance_due: i64,
        attempted: i64,
    },

    /// Non-positive or out-of-range quantity.
    #[error("Invalid quantity {quantity} for {entity}: {reason}")]
    InvalidQuantity {
        entity: String,
        quantity: i64,
        reason: String,
    },

    /// An entity from one tenant was referenced by another.
    ///
    /// This is an invariant violation, not a soft validation failure.
    #[error("{entity} {id} does not belong to tenant {tenant_id}")]
    TenantMismatch {
        entity: String,
        id: i64,
        tenant_id: i64,
    },

    /// Entity cannot be found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A product with the same name and category already exists.
    #[error("Product '{name}' already exists in category '{category}'")]
    DuplicateProduct { name: String, category: String },

    /// Identical stock (same attribute set and same lot) already exists.
    #[error("Variant with attributes [{attributes}] already holds an identical lot (variant {variant_id})")]
    DuplicateStock { attributes: String, variant_id: i64 },

    /// Generated identifiers kept colliding.
    #[error("Could not generate a unique {kind} after {attempts} attempts")]
    IdentifierExhausted { kind: String, attempts: u32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InsufficientStock error.
    pub fn insufficient(entity: impl Into<String>, requested: i64, available: i64) -> Self {
        CoreError::InsufficientStock {
            entity: entity.into(),
            requested,
            available,
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl ToString,
        state: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.to_string(),
            state: state.into(),
            operation: operation.into(),
        }
    }

    /// Creates a TenantMismatch error.
    pub fn tenant_mismatch(entity: impl Into<String>, id: i64, tenant_id: i64) -> Self {
        CoreError::TenantMismatch {
            entity: entity.into(),
            id,
            tenant_id,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by the top-down request validation before anything is persisted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value inside one request.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
