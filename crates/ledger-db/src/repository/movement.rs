//! # Movement Repository
//!
//! Planned stock movements between warehouses.
//!
//! ## Lifecycles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockRequest                         Transfer                          │
//! │                                                                         │
//! │  create ─► store short? ─► pending    create ─► pending                 │
//! │                │                                 │                      │
//! │                └─ enough ─► Sufficient           ├── execute ─► completed│
//! │                    (nothing stored)              │   FIFO over source   │
//! │  pending ─► confirm ─► approved ──────► pending  │   rows, credited     │
//! │          ─► reject  ─► rejected    (new transfer)│   per lot            │
//! │          ─► update quantity / delete             └── cancel ─► cancelled│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::inventory::move_between;
use crate::repository::warehouse::{general_warehouse, store_warehouse};
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::fifo::{self, StockSlot};
use ledger_core::validation::validate_quantity;
use ledger_core::{
    CoreError, CreateStockRequest, CreateTransferRequest, Inventory, Lot, Product, StockMovement,
    StockRequest, StockRequestOutcome, StockRequestStatus, Store, Transfer, TransferStatus,
    Warehouse,
};

/// Positive-quantity rows of a product in a warehouse as FIFO slots.
async fn warehouse_slots(
    conn: &mut SqliteConnection,
    warehouse_id: i64,
    product_id: i64,
    lot_id: Option<i64>,
) -> DbResult<Vec<StockSlot>> {
    let rows: Vec<(i64, i64, NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT i.id, i.lot_id, l.purchase_date, i.quantity
        FROM inventory i
        JOIN lots l ON l.id = i.lot_id
        WHERE i.warehouse_id = ?1 AND i.product_id = ?2 AND i.quantity > 0
          AND (?3 IS NULL OR i.lot_id = ?3)
        ORDER BY l.purchase_date, l.id, i.id
        "#,
    )
    .bind(warehouse_id)
    .bind(product_id)
    .bind(lot_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(key, lot_id, purchase_date, available)| StockSlot {
            key,
            lot_id,
            purchase_date,
            available,
        })
        .collect())
}

async fn insert_transfer(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    product_id: i64,
    source_warehouse_id: i64,
    destination_warehouse_id: i64,
    quantity: i64,
) -> DbResult<Transfer> {
    let transfer = sqlx::query_as(
        r#"
        INSERT INTO transfers (
            tenant_id, product_id, source_warehouse_id, destination_warehouse_id,
            quantity, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(product_id)
    .bind(source_warehouse_id)
    .bind(destination_warehouse_id)
    .bind(quantity)
    .bind(TransferStatus::Pending)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(transfer)
}

async fn pending_request(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    request_id: i64,
    operation: &str,
) -> DbResult<StockRequest> {
    let request: StockRequest = fetch_scoped(conn, request_id, tenant_id).await?;
    if request.status != StockRequestStatus::Pending {
        return Err(CoreError::invalid_state(
            "StockRequest",
            request_id,
            request.status.as_str(),
            operation,
        )
        .into());
    }
    Ok(request)
}

/// Repository for transfers and stock requests.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Records a pending transfer. No stock moves until it is executed.
    pub async fn create_transfer(
        &self,
        tenant_id: i64,
        req: &CreateTransferRequest,
    ) -> DbResult<Transfer> {
        validate_quantity("transfer quantity", req.quantity)?;
        if req.source_warehouse_id == req.destination_warehouse_id {
            return Err(ledger_core::ValidationError::InvalidFormat {
                field: "destination warehouse".to_string(),
                reason: "must differ from the source warehouse".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        fetch_scoped::<Product>(&mut *tx, req.product_id, tenant_id).await?;
        fetch_scoped::<Warehouse>(&mut *tx, req.source_warehouse_id, tenant_id).await?;
        fetch_scoped::<Warehouse>(&mut *tx, req.destination_warehouse_id, tenant_id).await?;

        let transfer = insert_transfer(
            &mut *tx,
            tenant_id,
            req.product_id,
            req.source_warehouse_id,
            req.destination_warehouse_id,
            req.quantity,
        )
        .await?;
        tx.commit().await?;

        info!(tenant_id, transfer_id = transfer.id, "Transfer created");
        Ok(transfer)
    }

    pub async fn get_transfer(&self, tenant_id: i64, transfer_id: i64) -> DbResult<Transfer> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut *conn, transfer_id, tenant_id).await
    }

    /// Transfers of the tenant, newest first, optionally by status.
    pub async fn list_transfers(
        &self,
        tenant_id: i64,
        status: Option<TransferStatus>,
    ) -> DbResult<Vec<Transfer>> {
        let transfers = sqlx::query_as(
            r#"
            SELECT * FROM transfers
            WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(transfers)
    }

    /// Executes a pending transfer.
    ///
    /// ## What This Does
    /// 1. Draws the quantity FIFO (oldest lot first) across the source
    ///    warehouse's rows of the product
    /// 2. Credits each lot separately in the destination's default section
    /// 3. Logs each lot, `to_store` or `to_general` by destination type
    /// 4. Marks the transfer completed
    ///
    /// ## Returns
    /// * `InvalidState` - the transfer is not pending
    /// * `InsufficientStock` - the source holds less than the quantity;
    ///   nothing moves
    pub async fn execute_transfer(
        &self,
        tenant_id: i64,
        transfer_id: i64,
        confirmed_by: &str,
    ) -> DbResult<(Transfer, Vec<StockMovement>)> {
        ledger_core::validation::validate_text("confirmed by", confirmed_by, 100)?;
        debug!(tenant_id, transfer_id, confirmed_by, "Executing transfer");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let transfer: Transfer = fetch_scoped(&mut *tx, transfer_id, tenant_id).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(CoreError::invalid_state(
                "Transfer",
                transfer_id,
                transfer.status.as_str(),
                "execute",
            )
            .into());
        }

        let source: Warehouse =
            fetch_scoped(&mut *tx, transfer.source_warehouse_id, tenant_id).await?;
        let destination: Warehouse =
            fetch_scoped(&mut *tx, transfer.destination_warehouse_id, tenant_id).await?;

        let slots = warehouse_slots(&mut *tx, source.id, transfer.product_id, None).await?;
        let plan = fifo::plan(slots, transfer.quantity);
        if !plan.is_satisfied() {
            return Err(CoreError::insufficient(
                format!("product {} in warehouse {}", transfer.product_id, source.warehouse_code),
                transfer.quantity,
                plan.allocated(),
            )
            .into());
        }

        let mut movements = Vec::with_capacity(plan.takes.len());
        for take in &plan.takes {
            let row: Inventory = fetch_scoped(&mut *tx, take.key, tenant_id).await?;
            let movement = move_between(
                &mut *tx,
                tenant_id,
                &row,
                source.warehouse_type,
                &destination,
                take.quantity,
            )
            .await?;
            movements.push(movement);
        }

        let completed: Transfer = sqlx::query_as(
            r#"
            UPDATE transfers SET status = ?2, confirmed_by = ?3, completed_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(transfer.id)
        .bind(TransferStatus::Completed)
        .bind(confirmed_by.trim())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            tenant_id,
            transfer_id,
            lots = movements.len(),
            quantity = completed.quantity,
            "Transfer executed"
        );
        Ok((completed, movements))
    }

    /// Cancels a pending transfer.
    pub async fn cancel_transfer(&self, tenant_id: i64, transfer_id: i64) -> DbResult<Transfer> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let transfer: Transfer = fetch_scoped(&mut *tx, transfer_id, tenant_id).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(CoreError::invalid_state(
                "Transfer",
                transfer_id,
                transfer.status.as_str(),
                "cancel",
            )
            .into());
        }

        let cancelled: Transfer =
            sqlx::query_as("UPDATE transfers SET status = ?2 WHERE id = ?1 RETURNING *")
                .bind(transfer.id)
                .bind(TransferStatus::Cancelled)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        info!(tenant_id, transfer_id, "Transfer cancelled");
        Ok(cancelled)
    }

    // =========================================================================
    // Stock Requests
    // =========================================================================

    /// Asks the general warehouse for whatever the store is short of.
    ///
    /// ## What This Does
    /// Simulates a FIFO draw of `quantity` against the store's stock of the
    /// product (or of one lot). If the store can cover it, nothing is stored
    /// and [`StockRequestOutcome::Sufficient`] is returned; otherwise a
    /// pending request for exactly the shortfall is persisted.
    pub async fn create_stock_request(
        &self,
        tenant_id: i64,
        req: &CreateStockRequest,
    ) -> DbResult<StockRequestOutcome> {
        validate_quantity("requested quantity", req.quantity)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        fetch_scoped::<Store>(&mut *tx, req.store_id, tenant_id).await?;
        let product: Product = fetch_scoped(&mut *tx, req.product_id, tenant_id).await?;
        if let Some(lot_id) = req.lot_id {
            let lot: Lot = fetch_scoped(&mut *tx, lot_id, tenant_id).await?;
            if lot.product_id != product.id {
                return Err(CoreError::not_found(
                    "Lot",
                    format!("{} of product {}", lot_id, product.id),
                )
                .into());
            }
        }

        let store_wh = store_warehouse(&mut *tx, tenant_id, req.store_id).await?;
        let general = general_warehouse(&mut *tx, tenant_id).await?;

        let slots = warehouse_slots(&mut *tx, store_wh.id, product.id, req.lot_id).await?;
        let available = fifo::total_available(&slots);
        let plan = fifo::plan(slots, req.quantity);

        if plan.is_satisfied() {
            debug!(store_id = req.store_id, available, "Store stock sufficient, no request stored");
            return Ok(StockRequestOutcome::Sufficient { available });
        }

        let now = Utc::now();
        let request: StockRequest = sqlx::query_as(
            r#"
            INSERT INTO stock_requests (
                tenant_id, store_id, warehouse_from_id, warehouse_to_id, product_id, lot_id,
                quantity_requested, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(req.store_id)
        .bind(general.id)
        .bind(store_wh.id)
        .bind(product.id)
        .bind(req.lot_id)
        .bind(plan.shortfall)
        .bind(StockRequestStatus::Pending)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            tenant_id,
            request_id = request.id,
            shortfall = plan.shortfall,
            "Stock request created"
        );
        Ok(StockRequestOutcome::Requested { request })
    }

    /// Stock requests, pending first then newest first.
    pub async fn list_stock_requests(
        &self,
        tenant_id: i64,
        status: Option<StockRequestStatus>,
        product_id: Option<i64>,
    ) -> DbResult<Vec<StockRequest>> {
        let requests = sqlx::query_as(
            r#"
            SELECT * FROM stock_requests
            WHERE tenant_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR product_id = ?3)
            ORDER BY CASE status WHEN 'pending' THEN 0 ELSE 1 END, created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Changes the quantity of a pending request.
    pub async fn update_stock_request_quantity(
        &self,
        tenant_id: i64,
        request_id: i64,
        quantity: i64,
    ) -> DbResult<StockRequest> {
        validate_quantity("requested quantity", quantity)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        pending_request(&mut *tx, tenant_id, request_id, "update").await?;
        let updated: StockRequest = sqlx::query_as(
            r#"
            UPDATE stock_requests SET quantity_requested = ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes a pending request.
    pub async fn delete_stock_request(&self, tenant_id: i64, request_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        pending_request(&mut *tx, tenant_id, request_id, "delete").await?;
        sqlx::query("DELETE FROM stock_requests WHERE id = ?1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(tenant_id, request_id, "Stock request deleted");
        Ok(())
    }

    /// Approves a pending request and creates the pending transfer that
    /// will fill it from the general warehouse.
    pub async fn confirm_stock_request(
        &self,
        tenant_id: i64,
        request_id: i64,
    ) -> DbResult<(StockRequest, Transfer)> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let request = pending_request(&mut *tx, tenant_id, request_id, "confirm").await?;
        let transfer = insert_transfer(
            &mut *tx,
            tenant_id,
            request.product_id,
            request.warehouse_from_id,
            request.warehouse_to_id,
            request.quantity_requested,
        )
        .await?;

        let approved: StockRequest = sqlx::query_as(
            r#"
            UPDATE stock_requests SET status = ?2, transfer_id = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(StockRequestStatus::Approved)
        .bind(transfer.id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant_id, request_id, transfer_id = transfer.id, "Stock request approved");
        Ok((approved, transfer))
    }

    /// Rejects a pending request.
    pub async fn reject_stock_request(
        &self,
        tenant_id: i64,
        request_id: i64,
    ) -> DbResult<StockRequest> {
        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        pending_request(&mut *tx, tenant_id, request_id, "reject").await?;
        let rejected: StockRequest = sqlx::query_as(
            "UPDATE stock_requests SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(request_id)
        .bind(StockRequestStatus::Rejected)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant_id, request_id, "Stock request rejected");
        Ok(rejected)
    }
}
