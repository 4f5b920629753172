//! # Tenant Repository
//!
//! Tenants and their stores. Creating a store also creates its store
//! warehouse, so every store can receive stock immediately.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::repository::warehouse::insert_warehouse;
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::validation::{validate_store_code, validate_text};
use ledger_core::{CoreError, Store, Tenant, Warehouse, WarehouseType, MAX_NAME_LENGTH};

/// Repository for tenant and store operations.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates a tenant.
    ///
    /// ## Returns
    /// * `UniqueViolation` when the name is taken
    pub async fn create_tenant(&self, name: &str) -> DbResult<Tenant> {
        validate_text("tenant name", name, MAX_NAME_LENGTH)?;

        let now = Utc::now();
        let tenant: Tenant = sqlx::query_as(
            "INSERT INTO tenants (name, created_at, updated_at) VALUES (?1, ?2, ?2) RETURNING *",
        )
        .bind(name.trim())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(tenant_id = tenant.id, name = %tenant.name, "Tenant created");
        Ok(tenant)
    }

    pub async fn get_tenant(&self, tenant_id: i64) -> DbResult<Tenant> {
        let tenant: Option<Tenant> = sqlx::query_as("SELECT * FROM tenants WHERE id = ?1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        tenant.ok_or_else(|| CoreError::not_found("Tenant", tenant_id).into())
    }

    /// Creates a store and its store warehouse in one transaction.
    ///
    /// ## Arguments
    /// * `code` - Short store code; its first letter or digit is used in
    ///   receipt numbers
    ///
    /// ## Returns
    /// The store and its warehouse (named `"<store> Warehouse"`).
    pub async fn create_store(
        &self,
        tenant_id: i64,
        name: &str,
        code: &str,
        address: Option<&str>,
    ) -> DbResult<(Store, Warehouse)> {
        validate_text("store name", name, MAX_NAME_LENGTH)?;
        validate_store_code(code)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let store: Store = sqlx::query_as(
            r#"
            INSERT INTO stores (tenant_id, name, code, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name.trim())
        .bind(code.trim())
        .bind(address)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let warehouse_name = format!("{} Warehouse", store.name);
        let warehouse = insert_warehouse(
            &mut *tx,
            tenant_id,
            &warehouse_name,
            address,
            WarehouseType::Store,
            Some(store.id),
        )
        .await?;

        tx.commit().await?;

        info!(
            tenant_id,
            store_id = store.id,
            warehouse_id = warehouse.id,
            code = %store.code,
            "Store created"
        );
        Ok((store, warehouse))
    }

    pub async fn get_store(&self, tenant_id: i64, store_id: i64) -> DbResult<Store> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut *conn, store_id, tenant_id).await
    }

    pub async fn list_stores(&self, tenant_id: i64) -> DbResult<Vec<Store>> {
        let stores = sqlx::query_as("SELECT * FROM stores WHERE tenant_id = ?1 ORDER BY id")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(stores)
    }
}
