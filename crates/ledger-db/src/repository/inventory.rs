//! # Inventory Repository
//!
//! The inventory ledger: quantities per `(lot, warehouse, section)` and the
//! audit trail of every movement between rows.
//!
//! ## Movement Primitives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_or_create_inventory   INSERT .. ON CONFLICT DO NOTHING, re-read   │
//! │  add_quantity              quantity += n                               │
//! │  deduct_quantity           quantity -= n  WHERE quantity >= n          │
//! │  adjust_lot_quantity       lot mirror of the general warehouse row     │
//! │  move_between              deduct → credit → mirror lot → append log   │
//! │  sync_from_lot             lot quantity edit → general warehouse row   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Allocation and Return
//! ```text
//!   add_inventory (general → store)          return_inventory (store → origin)
//!
//!   pre-check every item                     pre-check every item
//!     lots of the variant >= qty               store rows of the lot >= qty
//!     general rows of those lots >= qty      walk each store row's funding
//!   FIFO over lots (purchase_date, id)         logs oldest first, credit the
//!   move_between per lot  ─► to_store log      log's source, shrink the log
//! ```
//!
//! Both batches are all-or-nothing: the first failing item rolls back the
//! whole transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::warehouse::{default_section, general_warehouse, store_warehouse};
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::fifo::{self, StockSlot};
use ledger_core::validation::{
    check_movement_quantity, validate_inventory_batch, validate_return_batch,
};
use ledger_core::{
    CoreError, Inventory, InventoryItemRequest, Lot, Product, ReturnItemRequest, StockMovement,
    StockStatus, StockSummary, Store, TransferDirection, TransferLog, Variant, Warehouse,
    WarehouseType,
};

// =============================================================================
// Primitives
// =============================================================================

/// Identity of the stock a row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LotRef {
    pub product_id: i64,
    pub variant_id: i64,
    pub lot_id: i64,
}

impl From<&Lot> for LotRef {
    fn from(lot: &Lot) -> Self {
        LotRef {
            product_id: lot.product_id,
            variant_id: lot.variant_id,
            lot_id: lot.id,
        }
    }
}

impl From<&Inventory> for LotRef {
    fn from(row: &Inventory) -> Self {
        LotRef {
            product_id: row.product_id,
            variant_id: row.variant_id,
            lot_id: row.lot_id,
        }
    }
}

/// Returns the row for `(lot, warehouse, section)`, creating it at zero.
pub(crate) async fn get_or_create_inventory(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    warehouse_id: i64,
    section_id: i64,
    stock: LotRef,
) -> DbResult<Inventory> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO inventory (
            tenant_id, warehouse_id, section_id, product_id, variant_id, lot_id,
            quantity, added_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
        ON CONFLICT (lot_id, warehouse_id, section_id) DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(warehouse_id)
    .bind(section_id)
    .bind(stock.product_id)
    .bind(stock.variant_id)
    .bind(stock.lot_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let row: Inventory = sqlx::query_as(
        "SELECT * FROM inventory WHERE lot_id = ?1 AND warehouse_id = ?2 AND section_id = ?3",
    )
    .bind(stock.lot_id)
    .bind(warehouse_id)
    .bind(section_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

async fn find_inventory(
    conn: &mut SqliteConnection,
    warehouse_id: i64,
    section_id: i64,
    lot_id: i64,
) -> DbResult<Option<Inventory>> {
    let row = sqlx::query_as(
        "SELECT * FROM inventory WHERE lot_id = ?1 AND warehouse_id = ?2 AND section_id = ?3",
    )
    .bind(lot_id)
    .bind(warehouse_id)
    .bind(section_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub(crate) async fn add_quantity(
    conn: &mut SqliteConnection,
    inventory_id: i64,
    quantity: i64,
) -> DbResult<()> {
    check_movement_quantity("inventory credit", quantity)?;

    let result =
        sqlx::query("UPDATE inventory SET quantity = quantity + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(inventory_id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::not_found("Inventory", inventory_id).into());
    }
    Ok(())
}

/// Removes `quantity` units, failing without effect when fewer are held.
///
/// ## Returns
/// * `InsufficientStock` with the row's current quantity
pub(crate) async fn deduct_quantity(
    conn: &mut SqliteConnection,
    inventory_id: i64,
    quantity: i64,
) -> DbResult<()> {
    check_movement_quantity("inventory debit", quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE inventory SET quantity = quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(inventory_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current: Option<i64> = sqlx::query_scalar("SELECT quantity FROM inventory WHERE id = ?1")
            .bind(inventory_id)
            .fetch_optional(&mut *conn)
            .await?;
        return Err(match current {
            Some(available) => {
                CoreError::insufficient(format!("inventory {}", inventory_id), quantity, available)
            }
            None => CoreError::not_found("Inventory", inventory_id),
        }
        .into());
    }
    Ok(())
}

/// Moves a lot's mirrored quantity by `delta`, never below zero.
pub(crate) async fn adjust_lot_quantity(
    conn: &mut SqliteConnection,
    lot_id: i64,
    delta: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE lots SET quantity = quantity + ?2, updated_at = ?3
        WHERE id = ?1 AND quantity + ?2 >= 0
        "#,
    )
    .bind(lot_id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current: i64 = sqlx::query_scalar("SELECT quantity FROM lots WHERE id = ?1")
            .bind(lot_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::not_found("Lot", lot_id))?;
        return Err(CoreError::insufficient(format!("lot {}", lot_id), -delta, current).into());
    }
    Ok(())
}

pub(crate) async fn append_log(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    source_inventory_id: Option<i64>,
    destination_inventory_id: Option<i64>,
    stock: LotRef,
    quantity: i64,
    direction: TransferDirection,
) -> DbResult<TransferLog> {
    let log: TransferLog = sqlx::query_as(
        r#"
        INSERT INTO transfer_logs (
            tenant_id, source_inventory_id, destination_inventory_id,
            product_id, variant_id, lot_id, quantity, direction, transferred_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING *
        "#,
    )
    .bind(tenant_id)
    .bind(source_inventory_id)
    .bind(destination_inventory_id)
    .bind(stock.product_id)
    .bind(stock.variant_id)
    .bind(stock.lot_id)
    .bind(quantity)
    .bind(direction)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(log)
}

/// Moves units of one lot from `source` to the default section of
/// `destination`, keeping the lot mirror and the audit log in step.
pub(crate) async fn move_between(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    source: &Inventory,
    source_type: WarehouseType,
    destination: &Warehouse,
    quantity: i64,
) -> DbResult<StockMovement> {
    let stock = LotRef::from(source);

    deduct_quantity(conn, source.id, quantity).await?;
    if source_type == WarehouseType::General {
        adjust_lot_quantity(conn, stock.lot_id, -quantity).await?;
    }

    let section = default_section(conn, tenant_id, destination.id).await?;
    let target = get_or_create_inventory(conn, tenant_id, destination.id, section.id, stock).await?;
    add_quantity(conn, target.id, quantity).await?;
    if destination.warehouse_type == WarehouseType::General {
        adjust_lot_quantity(conn, stock.lot_id, quantity).await?;
    }

    let direction = TransferDirection::towards(destination.warehouse_type);
    let log = append_log(
        conn,
        tenant_id,
        Some(source.id),
        Some(target.id),
        stock,
        quantity,
        direction,
    )
    .await?;

    debug!(
        lot_id = stock.lot_id,
        quantity,
        from = source.id,
        to = target.id,
        "Stock moved"
    );

    Ok(StockMovement {
        product_id: stock.product_id,
        variant_id: stock.variant_id,
        lot_id: stock.lot_id,
        quantity,
        source_inventory_id: source.id,
        destination_inventory_id: target.id,
        transfer_log_id: log.id,
    })
}

/// Applies a change of a lot's quantity to its general-warehouse row.
///
/// The lot itself is not touched; callers have already written it.
///
/// ## Returns
/// * `Configuration` - the tenant has no general warehouse
/// * `NegativeInventory` - the row would drop below zero
pub(crate) async fn sync_from_lot(
    conn: &mut SqliteConnection,
    lot: &Lot,
    delta: i64,
) -> DbResult<Option<Inventory>> {
    if delta == 0 {
        return Ok(None);
    }

    let general = general_warehouse(conn, lot.tenant_id).await?;
    let section = default_section(conn, lot.tenant_id, general.id).await?;
    let row =
        get_or_create_inventory(conn, lot.tenant_id, general.id, section.id, LotRef::from(lot))
            .await?;

    if delta > 0 {
        add_quantity(conn, row.id, delta).await?;
    } else {
        if row.quantity + delta < 0 {
            return Err(CoreError::NegativeInventory {
                inventory: row.id.to_string(),
                current: row.quantity,
                delta,
            }
            .into());
        }
        deduct_quantity(conn, row.id, -delta).await?;
    }

    debug!(lot_id = lot.id, inventory_id = row.id, delta, "Synced general inventory from lot");
    Ok(Some(Inventory {
        quantity: row.quantity + delta,
        ..row
    }))
}

/// `true` once any of the lot's stock has left the general warehouse.
pub(crate) async fn lot_is_distributed(conn: &mut SqliteConnection, lot: &Lot) -> DbResult<bool> {
    let distributed: i64 = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM inventory i
            JOIN warehouses w ON w.id = i.warehouse_id
            WHERE i.lot_id = ?1 AND w.warehouse_type <> 'general'
        ) OR EXISTS (
            SELECT 1 FROM transfer_logs WHERE lot_id = ?1
        )
        "#,
    )
    .bind(lot.id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(distributed != 0)
}

async fn scoped_lot_of(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    product_id: i64,
    variant_id: i64,
    lot_id: i64,
) -> DbResult<Lot> {
    let lot: Lot = fetch_scoped(conn, lot_id, tenant_id).await?;
    if lot.variant_id != variant_id || lot.product_id != product_id {
        return Err(CoreError::not_found(
            "Lot",
            format!("{} of variant {} of product {}", lot_id, variant_id, product_id),
        )
        .into());
    }
    Ok(lot)
}

// =============================================================================
// Repository
// =============================================================================

/// One planned FIFO draw from the general warehouse.
struct PlannedDraw {
    row: Inventory,
    quantity: i64,
}

/// Repository for inventory ledger operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Allocates stock from the general warehouse to a store.
    ///
    /// ## What This Does
    /// 1. Pre-checks every item against the variant's lots and the general
    ///    warehouse rows of those lots; nothing moves if any item is short
    /// 2. Draws each item FIFO across lots (oldest purchase first), or from
    ///    the given lot only
    /// 3. Credits the store warehouse's default section and logs each lot
    ///    `to_store`
    ///
    /// ## Returns
    /// One [`StockMovement`] per lot drawn.
    pub async fn add_inventory(
        &self,
        tenant_id: i64,
        store_id: i64,
        items: &[InventoryItemRequest],
    ) -> DbResult<Vec<StockMovement>> {
        validate_inventory_batch(items)?;
        debug!(tenant_id, store_id, items = items.len(), "Allocating inventory to store");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        fetch_scoped::<Store>(&mut *tx, store_id, tenant_id).await?;
        let store_wh = store_warehouse(&mut *tx, tenant_id, store_id).await?;
        let general = general_warehouse(&mut *tx, tenant_id).await?;
        let general_section = default_section(&mut *tx, tenant_id, general.id).await?;

        // Phase 1: plan every item before writing anything.
        let mut draws: Vec<PlannedDraw> = Vec::new();
        for item in items {
            let product: Product = fetch_scoped(&mut *tx, item.product_id, tenant_id).await?;
            let variant: Variant = fetch_scoped(&mut *tx, item.variant_id, tenant_id).await?;
            if variant.product_id != product.id {
                return Err(CoreError::not_found(
                    "Variant",
                    format!("{} of product {}", variant.id, product.id),
                )
                .into());
            }

            let (entity, lots) = match item.lot_id {
                Some(lot_id) => {
                    let lot =
                        scoped_lot_of(&mut *tx, tenant_id, product.id, variant.id, lot_id).await?;
                    (format!("lot {}", lot_id), vec![lot])
                }
                None => {
                    let lots: Vec<Lot> = sqlx::query_as(
                        r#"
                        SELECT * FROM lots
                        WHERE variant_id = ?1 AND quantity > 0
                        ORDER BY purchase_date, id
                        "#,
                    )
                    .bind(variant.id)
                    .fetch_all(&mut *tx)
                    .await?;
                    (format!("variant {}", variant.id), lots)
                }
            };

            let lot_available: i64 = lots.iter().map(|l| l.quantity).sum();
            if lot_available < item.quantity {
                return Err(CoreError::insufficient(entity, item.quantity, lot_available).into());
            }

            let mut rows = Vec::with_capacity(lots.len());
            let mut slots = Vec::with_capacity(lots.len());
            for lot in &lots {
                if let Some(row) =
                    find_inventory(&mut *tx, general.id, general_section.id, lot.id).await?
                {
                    slots.push(StockSlot {
                        key: row.id,
                        lot_id: lot.id,
                        purchase_date: lot.purchase_date,
                        available: row.quantity.min(lot.quantity),
                    });
                    rows.push(row);
                }
            }

            let plan = fifo::plan(slots, item.quantity);
            if !plan.is_satisfied() {
                return Err(CoreError::insufficient(
                    format!("general inventory of {}", entity),
                    item.quantity,
                    plan.allocated(),
                )
                .into());
            }

            for take in plan.takes {
                if let Some(row) = rows.iter().find(|r| r.id == take.key) {
                    draws.push(PlannedDraw {
                        row: row.clone(),
                        quantity: take.quantity,
                    });
                }
            }
        }

        // Phase 2: apply. A guarded deduct failing here rolls everything back.
        let mut movements = Vec::with_capacity(draws.len());
        for draw in &draws {
            let movement = move_between(
                &mut *tx,
                tenant_id,
                &draw.row,
                WarehouseType::General,
                &store_wh,
                draw.quantity,
            )
            .await?;
            movements.push(movement);
        }

        tx.commit().await?;

        info!(
            tenant_id,
            store_id,
            items = items.len(),
            lots = movements.len(),
            "Inventory allocated to store"
        );
        Ok(movements)
    }

    /// Returns store stock to the general warehouse.
    ///
    /// ## What This Does
    /// For each item, walks the lot's store rows oldest first and, within a
    /// row, the `to_store` logs that funded it from the general warehouse,
    /// oldest first. Each log's source row and the lot are credited, the log
    /// shrinks (or is deleted once fully reversed) and a return log is
    /// written. Units with no such log left (received from another store)
    /// go to the general warehouse's default section.
    ///
    /// ## Returns
    /// * `InvalidQuantity` - a non-positive quantity
    /// * `InsufficientStock` - the store holds less of the lot than asked
    pub async fn return_inventory(
        &self,
        tenant_id: i64,
        store_id: i64,
        items: &[ReturnItemRequest],
    ) -> DbResult<Vec<StockMovement>> {
        validate_return_batch(items)?;
        for item in items {
            check_movement_quantity(&format!("lot {}", item.lot_id), item.quantity)?;
        }
        debug!(tenant_id, store_id, items = items.len(), "Returning inventory from store");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        fetch_scoped::<Store>(&mut *tx, store_id, tenant_id).await?;
        let store_wh = store_warehouse(&mut *tx, tenant_id, store_id).await?;

        // Phase 1: every item must be covered by the store's rows of its lot.
        let mut plans: Vec<(Lot, Vec<Inventory>, i64)> = Vec::with_capacity(items.len());
        for item in items {
            let lot = scoped_lot_of(
                &mut *tx,
                tenant_id,
                item.product_id,
                item.variant_id,
                item.lot_id,
            )
            .await?;

            let rows: Vec<Inventory> = sqlx::query_as(
                r#"
                SELECT * FROM inventory
                WHERE warehouse_id = ?1 AND lot_id = ?2 AND quantity > 0
                ORDER BY added_at, id
                "#,
            )
            .bind(store_wh.id)
            .bind(lot.id)
            .fetch_all(&mut *tx)
            .await?;

            let held: i64 = rows.iter().map(|r| r.quantity).sum();
            if held < item.quantity {
                return Err(CoreError::insufficient(
                    format!("lot {} in store {}", lot.id, store_id),
                    item.quantity,
                    held,
                )
                .into());
            }
            plans.push((lot, rows, item.quantity));
        }

        // Phase 2: reverse funding logs oldest first.
        let mut movements = Vec::new();
        for (lot, rows, quantity) in &plans {
            let mut remaining = *quantity;
            for row in rows {
                if remaining == 0 {
                    break;
                }
                let from_row = row.quantity.min(remaining);
                let reversed =
                    reverse_funding(&mut *tx, tenant_id, row, from_row, &mut movements).await?;

                let uncovered = from_row - reversed;
                if uncovered > 0 {
                    debug!(
                        inventory_id = row.id,
                        uncovered, "Store stock not funded from general, returning to default section"
                    );
                    let general = general_warehouse(&mut *tx, tenant_id).await?;
                    let movement = move_between(
                        &mut *tx,
                        tenant_id,
                        row,
                        WarehouseType::Store,
                        &general,
                        uncovered,
                    )
                    .await?;
                    movements.push(movement);
                }
                remaining -= from_row;
            }
            debug!(lot_id = lot.id, quantity = *quantity, "Lot returned");
        }

        tx.commit().await?;

        info!(
            tenant_id,
            store_id,
            items = items.len(),
            movements = movements.len(),
            "Inventory returned from store"
        );
        Ok(movements)
    }

    pub async fn get_inventory(&self, tenant_id: i64, inventory_id: i64) -> DbResult<Inventory> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut *conn, inventory_id, tenant_id).await
    }

    /// Every inventory row of a warehouse, including empty ones.
    pub async fn list_inventory(&self, tenant_id: i64, warehouse_id: i64) -> DbResult<Vec<Inventory>> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Warehouse>(&mut *conn, warehouse_id, tenant_id).await?;

        let rows = sqlx::query_as(
            "SELECT * FROM inventory WHERE warehouse_id = ?1 ORDER BY product_id, lot_id, section_id",
        )
        .bind(warehouse_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Quantity and stock status of every product of the tenant in one
    /// warehouse. Products with no stock there are reported Out of Stock.
    pub async fn warehouse_stock(
        &self,
        tenant_id: i64,
        warehouse_id: i64,
    ) -> DbResult<Vec<StockSummary>> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Warehouse>(&mut *conn, warehouse_id, tenant_id).await?;

        let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.threshold_value, COALESCE(SUM(i.quantity), 0)
            FROM products p
            LEFT JOIN inventory i ON i.product_id = p.id AND i.warehouse_id = ?2
            WHERE p.tenant_id = ?1
            GROUP BY p.id, p.name, p.threshold_value
            ORDER BY p.name, p.id
            "#,
        )
        .bind(tenant_id)
        .bind(warehouse_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, product_name, threshold_value, quantity)| StockSummary {
                product_id,
                product_name,
                quantity,
                threshold_value,
                status: StockStatus::compute(quantity, threshold_value),
            })
            .collect())
    }

    /// Movement history of a lot, oldest first.
    pub async fn transfer_logs(&self, tenant_id: i64, lot_id: i64) -> DbResult<Vec<TransferLog>> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Lot>(&mut *conn, lot_id, tenant_id).await?;

        let logs = sqlx::query_as(
            "SELECT * FROM transfer_logs WHERE lot_id = ?1 ORDER BY transferred_at, id",
        )
        .bind(lot_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(logs)
    }
}

/// Reverses up to `quantity` units of `row` along the logs that funded it
/// from the general warehouse.
///
/// Returns how many units were reversed.
async fn reverse_funding(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    row: &Inventory,
    quantity: i64,
    movements: &mut Vec<StockMovement>,
) -> DbResult<i64> {
    // Logs funded by another store are left alone; those units go back
    // through the general fallback in the caller.
    let logs: Vec<TransferLog> = sqlx::query_as(
        r#"
        SELECT l.* FROM transfer_logs l
        JOIN inventory src ON src.id = l.source_inventory_id
        JOIN warehouses w ON w.id = src.warehouse_id
        WHERE l.destination_inventory_id = ?1
          AND l.direction = 'to_store'
          AND w.warehouse_type = 'general'
        ORDER BY l.transferred_at, l.id
        "#,
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    let stock = LotRef::from(row);
    let mut reversed = 0;
    for log in logs {
        if reversed == quantity {
            break;
        }
        let Some(source_id) = log.source_inventory_id else {
            continue;
        };
        let part = log.quantity.min(quantity - reversed);

        let source: Inventory = fetch_scoped(conn, source_id, tenant_id).await?;

        deduct_quantity(conn, row.id, part).await?;
        add_quantity(conn, source.id, part).await?;
        adjust_lot_quantity(conn, stock.lot_id, part).await?;

        let entry = append_log(
            conn,
            tenant_id,
            Some(row.id),
            Some(source.id),
            stock,
            part,
            TransferDirection::ToGeneral,
        )
        .await?;

        if part == log.quantity {
            sqlx::query("DELETE FROM transfer_logs WHERE id = ?1")
                .bind(log.id)
                .execute(&mut *conn)
                .await?;
        } else {
            sqlx::query("UPDATE transfer_logs SET quantity = quantity - ?2 WHERE id = ?1")
                .bind(log.id)
                .bind(part)
                .execute(&mut *conn)
                .await?;
        }

        movements.push(StockMovement {
            product_id: stock.product_id,
            variant_id: stock.variant_id,
            lot_id: stock.lot_id,
            quantity: part,
            source_inventory_id: row.id,
            destination_inventory_id: source.id,
            transfer_log_id: entry.id,
        });
        reversed += part;
    }
    Ok(reversed)
}
