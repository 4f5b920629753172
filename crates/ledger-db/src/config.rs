//! # Ledger Configuration
//!
//! Layered settings loaded with the `config` crate.
//!
//! ```text
//!  built-in defaults
//!       │  overridden by
//!       ▼
//!  ledger.toml (optional, working directory)
//!       │  overridden by
//!       ▼
//!  LEDGER_* environment variables
//!       e.g. LEDGER_DATABASE_PATH=./data/ledger.db
//!            LEDGER_MAX_CONNECTIONS=8
//!            LEDGER_SKU_MAX_ATTEMPTS=20
//! ```

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::DbResult;
use crate::pool::DbConfig;
use ledger_core::DEFAULT_IDENTIFIER_ATTEMPTS;

/// Settings for a ledger deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub database_path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub busy_timeout_ms: u64,
    pub run_migrations: bool,
    /// Attempts at a unique SKU or barcode before giving up.
    pub sku_max_attempts: u32,
}

impl LedgerConfig {
    /// Loads defaults, then `ledger.toml` if present, then the environment.
    pub fn load() -> DbResult<Self> {
        Self::load_from(Some(Path::new("ledger")))
    }

    /// Same as [`LedgerConfig::load`] with an explicit file (extension
    /// optional). `None` skips the file layer.
    pub fn load_from(file: Option<&Path>) -> DbResult<Self> {
        let mut builder = Config::builder()
            .set_default("database_path", "./ledger.db")?
            .set_default("max_connections", 5)?
            .set_default("min_connections", 1)?
            .set_default("connect_timeout_secs", 30)?
            .set_default("busy_timeout_ms", 5000)?
            .set_default("run_migrations", true)?
            .set_default("sku_max_attempts", DEFAULT_IDENTIFIER_ATTEMPTS as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .identifier_attempts(self.sku_max_attempts)
            .run_migrations(self.run_migrations)
    }
}
