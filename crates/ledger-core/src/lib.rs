//! # ledger-core: Pure Business Logic for the Inventory Ledger
//!
//! Domain types and the deterministic rules behind stock movement and sale
//! settlement, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Callers (HTTP layer, jobs, seed binary) - external       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ explicit tenant id on every call       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    ledger-db (repositories)                     │   │
//! │  │   one SQLite transaction per operation, pre-check then mutate   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  fifo   │ │  refund  │ │ codes  │  │   │
//! │  │   │requests │ │currency │ │ plans   │ │  shares  │ │WH/SKU  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │        settlement · validation · error                          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persistent entities (Lot, Inventory, Sale, Payment, ...)
//! - [`requests`] - Tagged request structures for every operation
//! - [`money`] - Integer money in minor units
//! - [`currency`] - USD/LRD conversion through a frozen rate
//! - [`fifo`] - Oldest-lot-first allocation plans
//! - [`refund`] - Proportional refund allocation with exact remainder
//! - [`settlement`] - Totals, balance due, payment status aggregation
//! - [`codes`] - Receipt numbers, warehouse codes, SKUs, EAN-13
//! - [`validation`] - Top-down request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::currency::RateBook;
//! use ledger_core::money::Money;
//! use ledger_core::types::Currency;
//!
//! // 200.00 LRD per USD
//! let rates = RateBook::new(20000).unwrap();
//! let grand_total = rates.grand_total(
//!     Money::from_cents(1000),   // 10 USD
//!     Money::from_cents(200000), // 2000 LRD
//!     Currency::Usd,
//! );
//! assert_eq!(grand_total.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codes;
pub mod currency;
pub mod error;
pub mod fifo;
pub mod money;
pub mod refund;
pub mod requests;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::RateBook;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Name given to a lazily created section.
pub const DEFAULT_SECTION_NAME: &str = "Default Section";

/// Maximum length of names (products, stores, attribute values).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum lines in one add-inventory or return-inventory batch.
pub const MAX_BATCH_ITEMS: usize = 200;

/// Maximum product lines in one sale.
pub const MAX_SALE_LINES: usize = 100;

/// Default bound on SKU/barcode generation attempts.
pub const DEFAULT_IDENTIFIER_ATTEMPTS: u32 = 10;
