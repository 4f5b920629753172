//! # ledger-db: Persistence Layer for the Inventory Ledger
//!
//! SQLite storage for tenants, catalog, inventory and sales, with every
//! business operation running as one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Data Flow                                 │
//! │                                                                         │
//! │  Caller (service, CLI, seed binary)                                    │
//! │       │  tenant_id + request struct                                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ledger-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ Tenant  Sale   │    │  (embedded)  │  │   │
//! │  │   │               │    │ Catalog Report │    │              │  │   │
//! │  │   │ SqlitePool    │    │ Inventory      │    │ 001_init.sql │  │   │
//! │  │   │ busy_timeout  │    │ Movement  Rate │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │           ▲                    │                                │   │
//! │  │           │                    ▼                                │   │
//! │  │   LedgerConfig          ledger-core (FIFO, refunds, rates)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Layered settings (defaults, `ledger.toml`, `LEDGER_*`)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per ledger area
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_db::{Database, LedgerConfig};
//!
//! let db = Database::new(LedgerConfig::load()?.db_config()).await?;
//! let tenant = db.tenants().create_tenant("Acme").await?;
//! let stock = db.inventory().warehouse_stock(tenant.id, warehouse_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::exchange_rate::ExchangeRateRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::movement::MovementRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::tenant::TenantRepository;
pub use repository::warehouse::WarehouseRepository;
