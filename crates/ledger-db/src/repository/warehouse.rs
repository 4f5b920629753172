//! # Warehouse Repository
//!
//! Warehouse topology of a tenant: one general warehouse, one warehouse per
//! store, sections inside each.
//!
//! ## Topology
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tenant                                                                 │
//! │   ├── WH-001  general  ──► Default Section, Cold Room, ...             │
//! │   ├── WH-002  store(1) ──► Default Section                             │
//! │   └── WH-003  store(2) ──► Default Section                             │
//! │                                                                         │
//! │  Codes are sequential per tenant and never reused.                     │
//! │  "Default section" = the warehouse's first section by id.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::codes::{parse_warehouse_code, warehouse_code};
use ledger_core::validation::validate_text;
use ledger_core::{
    CoreError, Section, Store, Warehouse, WarehouseType, DEFAULT_SECTION_NAME, MAX_NAME_LENGTH,
};

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Next free `WH-nnn` code of the tenant.
async fn next_warehouse_code(conn: &mut SqliteConnection, tenant_id: i64) -> DbResult<String> {
    let codes: Vec<String> =
        sqlx::query_scalar("SELECT warehouse_code FROM warehouses WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_all(&mut *conn)
            .await?;

    let last = codes
        .iter()
        .filter_map(|c| parse_warehouse_code(c))
        .max()
        .unwrap_or(0);
    Ok(warehouse_code(last + 1))
}

/// Inserts a warehouse with the next code and gives it a default section.
pub(crate) async fn insert_warehouse(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    name: &str,
    location: Option<&str>,
    warehouse_type: WarehouseType,
    store_id: Option<i64>,
) -> DbResult<Warehouse> {
    let code = next_warehouse_code(conn, tenant_id).await?;
    let warehouse: Warehouse = sqlx::query_as(
        r#"
        INSERT INTO warehouses (
            tenant_id, warehouse_code, name, location, warehouse_type, store_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(&code)
    .bind(name.trim())
    .bind(location)
    .bind(warehouse_type)
    .bind(store_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    insert_section(conn, tenant_id, warehouse.id, DEFAULT_SECTION_NAME).await?;

    info!(
        tenant_id,
        warehouse_id = warehouse.id,
        code = %warehouse.warehouse_code,
        kind = warehouse_type.as_str(),
        "Warehouse created"
    );
    Ok(warehouse)
}

async fn insert_section(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    warehouse_id: i64,
    name: &str,
) -> DbResult<Section> {
    let section: Section = sqlx::query_as(
        r#"
        INSERT INTO sections (tenant_id, warehouse_id, name, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(name.trim())
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(section)
}

pub(crate) async fn find_general_warehouse(
    conn: &mut SqliteConnection,
    tenant_id: i64,
) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as(
        "SELECT * FROM warehouses WHERE tenant_id = ?1 AND warehouse_type = 'general'",
    )
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(warehouse)
}

/// The tenant's general warehouse, or a configuration error.
pub(crate) async fn general_warehouse(
    conn: &mut SqliteConnection,
    tenant_id: i64,
) -> DbResult<Warehouse> {
    find_general_warehouse(conn, tenant_id).await?.ok_or_else(|| {
        CoreError::Configuration(format!("tenant {} has no general warehouse", tenant_id)).into()
    })
}

async fn find_store_warehouse(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    store_id: i64,
) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as(
        "SELECT * FROM warehouses WHERE tenant_id = ?1 AND store_id = ?2 AND warehouse_type = 'store'",
    )
    .bind(tenant_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(warehouse)
}

/// The warehouse bound to a store, or a configuration error.
pub(crate) async fn store_warehouse(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    store_id: i64,
) -> DbResult<Warehouse> {
    find_store_warehouse(conn, tenant_id, store_id).await?.ok_or_else(|| {
        CoreError::Configuration(format!("store {} has no store warehouse", store_id)).into()
    })
}

/// First section of the warehouse by id, created when the warehouse has none.
pub(crate) async fn default_section(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    warehouse_id: i64,
) -> DbResult<Section> {
    let existing: Option<Section> = sqlx::query_as(
        "SELECT * FROM sections WHERE warehouse_id = ?1 ORDER BY id LIMIT 1",
    )
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(section) => Ok(section),
        None => {
            debug!(warehouse_id, "Creating default section");
            insert_section(conn, tenant_id, warehouse_id, DEFAULT_SECTION_NAME).await
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for warehouse and section operations.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Returns the tenant's general warehouse, creating it on first use.
    ///
    /// `name` and `location` only apply when the warehouse is created.
    pub async fn get_or_create_general_warehouse(
        &self,
        tenant_id: i64,
        name: &str,
        location: Option<&str>,
    ) -> DbResult<Warehouse> {
        validate_text("warehouse name", name, MAX_NAME_LENGTH)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let warehouse = match find_general_warehouse(&mut *tx, tenant_id).await? {
            Some(existing) => existing,
            None => {
                insert_warehouse(&mut *tx, tenant_id, name, location, WarehouseType::General, None)
                    .await?
            }
        };

        tx.commit().await?;
        Ok(warehouse)
    }

    /// Returns the store's warehouse, creating it when missing.
    pub async fn get_or_create_store_warehouse(
        &self,
        tenant_id: i64,
        store_id: i64,
    ) -> DbResult<Warehouse> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let store: Store = fetch_scoped(&mut *tx, store_id, tenant_id).await?;
        let warehouse = match find_store_warehouse(&mut *tx, tenant_id, store_id).await? {
            Some(existing) => existing,
            None => {
                let name = format!("{} Warehouse", store.name);
                insert_warehouse(
                    &mut *tx,
                    tenant_id,
                    &name,
                    store.address.as_deref(),
                    WarehouseType::Store,
                    Some(store.id),
                )
                .await?
            }
        };

        tx.commit().await?;
        Ok(warehouse)
    }

    /// The tenant's general warehouse.
    ///
    /// ## Returns
    /// * `Configuration` error when the tenant has none yet
    pub async fn general_warehouse(&self, tenant_id: i64) -> DbResult<Warehouse> {
        let mut conn = self.pool.acquire().await?;
        general_warehouse(&mut *conn, tenant_id).await
    }

    /// The warehouse bound to `store_id`.
    pub async fn store_warehouse(&self, tenant_id: i64, store_id: i64) -> DbResult<Warehouse> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Store>(&mut *conn, store_id, tenant_id).await?;
        store_warehouse(&mut *conn, tenant_id, store_id).await
    }

    pub async fn get_warehouse(&self, tenant_id: i64, warehouse_id: i64) -> DbResult<Warehouse> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut *conn, warehouse_id, tenant_id).await
    }

    pub async fn list_warehouses(&self, tenant_id: i64) -> DbResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as("SELECT * FROM warehouses WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(warehouses)
    }

    /// Adds a named section to a warehouse.
    ///
    /// ## Returns
    /// * `UniqueViolation` when the warehouse already has a section of that name
    pub async fn create_section(
        &self,
        tenant_id: i64,
        warehouse_id: i64,
        name: &str,
    ) -> DbResult<Section> {
        validate_text("section name", name, MAX_NAME_LENGTH)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;
        fetch_scoped::<Warehouse>(&mut *tx, warehouse_id, tenant_id).await?;

        let section = insert_section(&mut *tx, tenant_id, warehouse_id, name).await?;
        tx.commit().await?;

        debug!(warehouse_id, section_id = section.id, "Section created");
        Ok(section)
    }

    /// The warehouse's default section, created when it has none.
    pub async fn default_section(&self, tenant_id: i64, warehouse_id: i64) -> DbResult<Section> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;
        fetch_scoped::<Warehouse>(&mut *tx, warehouse_id, tenant_id).await?;

        let section = default_section(&mut *tx, tenant_id, warehouse_id).await?;
        tx.commit().await?;
        Ok(section)
    }

    pub async fn list_sections(&self, tenant_id: i64, warehouse_id: i64) -> DbResult<Vec<Section>> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Warehouse>(&mut *conn, warehouse_id, tenant_id).await?;

        let sections = sqlx::query_as("SELECT * FROM sections WHERE warehouse_id = ?1 ORDER BY id")
            .bind(warehouse_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(sections)
    }
}
