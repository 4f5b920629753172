//! # Sale Repository
//!
//! Sales, payments, refunds and cancellations.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. PROCESS                                                             │
//! │     └── process_sale()                                                  │
//! │         ├── receipt number (per tenant/store/year sequence)             │
//! │         ├── rate frozen onto the sale                                   │
//! │         ├── FIFO over non-expired store stock → one detail per lot      │
//! │         └── payments: Cash/Mobile_Money Completed, others Processing    │
//! │                                                                         │
//! │  2. SETTLE                                                              │
//! │     ├── add_payment()            never beyond the grand total           │
//! │     └── update_payment_status()  all failed → stock reversed, Failed    │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                   │
//! │     ├── partial_cancel()  refund only what is now overpaid              │
//! │     └── cancel_sale()     everything back, completed payments refunded  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts on a sale are in its settlement currency, converted through the
//! rate frozen at creation. Payments and refunds keep their own currency.

use chrono::{Datelike, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::exchange_rate::current_rate_book;
use crate::repository::inventory::{add_quantity, deduct_quantity};
use crate::repository::warehouse::store_warehouse;
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::codes::receipt_number;
use ledger_core::fifo::{self, StockSlot};
use ledger_core::refund::{self, Refundable};
use ledger_core::settlement::{self, Settlement};
use ledger_core::validation::{
    check_movement_quantity, validate_payment, validate_sale_request, validate_text,
};
use ledger_core::{
    CancelItemRequest, CancellationKind, CoreError, Inventory, Money, Payment, PaymentRequest,
    PaymentStatus, PaymentStatusUpdate, ProcessSaleRequest, Product, RateBook, Refund,
    ReversalEntry, Sale, SaleCancellationLog, SaleDetail, SaleWithDetails, Store,
    ValidationError,
};

/// Actor recorded when a reversal is triggered by payment settlement.
const SETTLEMENT_ACTOR: &str = "payment-settlement";

// =============================================================================
// Loading
// =============================================================================

async fn load_details(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleDetail>> {
    let details = sqlx::query_as("SELECT * FROM sale_details WHERE sale_id = ?1 ORDER BY id")
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(details)
}

async fn load_payments(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE sale_id = ?1 ORDER BY id")
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(payments)
}

async fn load_refunds(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<Refund>> {
    let refunds = sqlx::query_as("SELECT * FROM refunds WHERE sale_id = ?1 ORDER BY id")
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(refunds)
}

async fn load_full(conn: &mut SqliteConnection, sale: Sale) -> DbResult<SaleWithDetails> {
    let details = load_details(conn, sale.id).await?;
    let payments = load_payments(conn, sale.id).await?;
    let refunds = load_refunds(conn, sale.id).await?;
    Ok(SaleWithDetails {
        sale,
        details,
        payments,
        refunds,
    })
}

/// Loads a sale that still accepts changes.
async fn open_sale(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    sale_id: i64,
    operation: &str,
) -> DbResult<Sale> {
    let sale: Sale = fetch_scoped(conn, sale_id, tenant_id).await?;
    if sale.is_closed() {
        return Err(CoreError::invalid_state(
            "Sale",
            sale_id,
            sale.payment_status.as_str(),
            operation,
        )
        .into());
    }
    Ok(sale)
}

fn sale_rates(sale: &Sale) -> DbResult<RateBook> {
    Ok(RateBook::new(sale.exchange_rate_used)?)
}

// =============================================================================
// Settlement
// =============================================================================

/// Recomputes and stores totals, amount paid, balance and status.
///
/// `status` overrides the status aggregated from the payments.
async fn write_settlement(
    conn: &mut SqliteConnection,
    sale: &Sale,
    status: Option<PaymentStatus>,
) -> DbResult<Sale> {
    let rates = sale_rates(sale)?;
    let details = load_details(conn, sale.id).await?;
    let payments = load_payments(conn, sale.id).await?;

    let paid = settlement::amount_paid(&payments, &rates, sale.currency);
    let totals = Settlement::from_details(&details, paid, &rates, sale.currency);
    let status = status
        .unwrap_or_else(|| settlement::aggregate_status(payments.iter().map(|p| p.status)));

    let updated = sqlx::query_as(
        r#"
        UPDATE sales SET
            total_usd_cents = ?2,
            total_lrd_cents = ?3,
            grand_total_cents = ?4,
            amount_paid_cents = ?5,
            balance_due_cents = ?6,
            payment_status = ?7,
            updated_at = ?8
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(sale.id)
    .bind(totals.total_usd.cents())
    .bind(totals.total_lrd.cents())
    .bind(totals.grand_total.cents())
    .bind(totals.amount_paid.cents())
    .bind(totals.balance_due.cents())
    .bind(status)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(updated)
}

async fn insert_payment(
    conn: &mut SqliteConnection,
    sale: &Sale,
    req: &PaymentRequest,
) -> DbResult<Payment> {
    let now = Utc::now();
    let payment = sqlx::query_as(
        r#"
        INSERT INTO payments (
            tenant_id, sale_id, method, amount_cents, currency, status, reference,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        RETURNING *
        "#,
    )
    .bind(sale.tenant_id)
    .bind(sale.id)
    .bind(req.method)
    .bind(req.amount.cents())
    .bind(req.currency)
    .bind(req.method.initial_status())
    .bind(req.reference.as_deref())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(payment)
}

/// Fails with `Overpayment` when `amount` on top of `paid` passes the total.
fn ensure_within_total(
    sale_id: i64,
    grand_total: Money,
    paid: Money,
    amount: Money,
) -> DbResult<()> {
    if paid + amount > grand_total {
        return Err(CoreError::Overpayment {
            sale_id,
            balance_due: (grand_total - paid).clamp_non_negative().cents(),
            attempted: amount.cents(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Reversal
// =============================================================================

/// Puts `quantity` units of a detail back on its store row.
async fn restore_stock(
    conn: &mut SqliteConnection,
    detail: &SaleDetail,
    quantity: i64,
) -> DbResult<ReversalEntry> {
    let result = sqlx::query(
        r#"
        UPDATE sale_details SET cancelled_quantity = cancelled_quantity + ?2
        WHERE id = ?1 AND cancelled_quantity + ?2 <= quantity_sold
        "#,
    )
    .bind(detail.id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::InvalidQuantity {
            entity: format!("sale detail {}", detail.id),
            quantity,
            reason: format!("exceeds active quantity {}", detail.active_quantity()),
        }
        .into());
    }

    add_quantity(conn, detail.inventory_id, quantity).await?;

    Ok(ReversalEntry {
        sale_detail_id: detail.id,
        product_id: detail.product_id,
        lot_id: detail.lot_id,
        quantity,
    })
}

/// Reverses every active unit of the sale.
async fn restore_all(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<ReversalEntry>> {
    let details = load_details(conn, sale_id).await?;
    let mut entries = Vec::with_capacity(details.len());
    for detail in details.iter().filter(|d| d.active_quantity() > 0) {
        entries.push(restore_stock(conn, detail, detail.active_quantity()).await?);
    }
    Ok(entries)
}

/// Refunds `target` (sale currency) across `payments` in proportion to what
/// each still holds.
///
/// ## What This Does
/// Each payment's unrefunded amount is expressed in the sale currency and
/// handed to [`refund::allocate`]. A share equal to the payment's whole
/// balance refunds that balance exactly in the payment's currency; smaller
/// shares are converted back at the sale's rate.
///
/// ## Returns
/// The refunds written and their total in the sale currency.
async fn issue_refunds(
    conn: &mut SqliteConnection,
    sale: &Sale,
    payments: &[Payment],
    target: Money,
    processed_by: &str,
    reason: Option<&str>,
) -> DbResult<(Vec<Refund>, Money)> {
    let rates = sale_rates(sale)?;
    let refundable: Vec<Refundable> = payments
        .iter()
        .map(|p| Refundable {
            payment_id: p.id,
            available: rates.convert(p.unrefunded(), p.currency, sale.currency),
        })
        .collect();

    let shares = refund::allocate(&refundable, target);
    let now = Utc::now();
    let mut refunds = Vec::with_capacity(shares.len());
    let mut total = Money::zero();

    for share in &shares {
        let (payment, available) = match payments
            .iter()
            .zip(&refundable)
            .find(|(p, _)| p.id == share.payment_id)
        {
            Some((payment, r)) => (payment, r.available),
            None => continue,
        };

        let amount = if share.amount == available {
            payment.unrefunded()
        } else {
            rates
                .convert(share.amount, sale.currency, payment.currency)
                .min(payment.unrefunded())
        };
        if !amount.is_positive() {
            continue;
        }

        sqlx::query(
            r#"
            UPDATE payments SET refunded_amount_cents = refunded_amount_cents + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(payment.id)
        .bind(amount.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let refund: Refund = sqlx::query_as(
            r#"
            INSERT INTO refunds (
                tenant_id, payment_id, sale_id, amount_cents, currency, processed_by, reason,
                processed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(sale.tenant_id)
        .bind(payment.id)
        .bind(sale.id)
        .bind(amount.cents())
        .bind(payment.currency)
        .bind(processed_by)
        .bind(reason)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        total += share.amount;
        refunds.push(refund);
    }

    Ok((refunds, total))
}

async fn append_cancellation_log(
    conn: &mut SqliteConnection,
    sale: &Sale,
    kind: CancellationKind,
    actor: &str,
    reason: Option<&str>,
    refund_total: Money,
    entries: &[ReversalEntry],
) -> DbResult<SaleCancellationLog> {
    let summary = serde_json::to_string(entries)?;
    let log = sqlx::query_as(
        r#"
        INSERT INTO sale_cancellation_logs (
            tenant_id, sale_id, kind, cancelled_by, reason, refund_total_cents, summary,
            cancelled_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING *
        "#,
    )
    .bind(sale.tenant_id)
    .bind(sale.id)
    .bind(kind)
    .bind(actor)
    .bind(reason)
    .bind(refund_total.cents())
    .bind(summary)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(log)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale and settlement operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale against a store's stock.
    ///
    /// ## What This Does
    /// 1. Resolves the store warehouse and the tenant's latest rate
    /// 2. Takes the next receipt number of `(tenant, store, year)`
    /// 3. For each product, prices it at the retail price of its most
    ///    recently purchased lot and draws FIFO from non-expired store stock
    /// 4. Records the payments, rejecting any that pay past the grand total
    ///
    /// ## Returns
    /// * `Configuration` - no store warehouse or no exchange rate
    /// * `InsufficientStock` - a product is short; nothing is written
    /// * `Overpayment` - the payments exceed the grand total
    pub async fn process_sale(
        &self,
        tenant_id: i64,
        req: &ProcessSaleRequest,
    ) -> DbResult<SaleWithDetails> {
        validate_sale_request(req)?;
        debug!(
            tenant_id,
            store_id = req.store_id,
            lines = req.lines.len(),
            payments = req.payments.len(),
            "Processing sale"
        );
        let sale_date = req.sale_date.unwrap_or_else(Utc::now);
        let sale_day = sale_date.date_naive();

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let store: Store = fetch_scoped(&mut *tx, req.store_id, tenant_id).await?;
        let store_wh = store_warehouse(&mut *tx, tenant_id, store.id).await?;
        let rates = current_rate_book(&mut *tx, tenant_id).await?;

        // The tenant lock is held until commit, so the sequence cannot be
        // taken twice.
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO receipt_sequences (tenant_id, store_id, year, last_sequence)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT (tenant_id, store_id, year)
            DO UPDATE SET last_sequence = last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(tenant_id)
        .bind(store.id)
        .bind(sale_date.year())
        .fetch_one(&mut *tx)
        .await?;
        let receipt = receipt_number(tenant_id, &store.code, sale_date.year(), sequence)?;

        let now = Utc::now();
        let sale: Sale = sqlx::query_as(
            r#"
            INSERT INTO sales (
                tenant_id, store_id, cashier_id, receipt_number, sale_date, currency,
                exchange_rate_used, payment_status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(store.id)
        .bind(req.cashier_id.trim())
        .bind(&receipt)
        .bind(sale_date)
        .bind(req.currency)
        .bind(rates.usd_rate())
        .bind(PaymentStatus::Processing)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut details: Vec<SaleDetail> = Vec::new();
        for line in &req.lines {
            let product: Product = fetch_scoped(&mut *tx, line.product_id, tenant_id).await?;
            let entity = format!("product {} ({})", product.id, product.name);

            let price: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT retail_price_cents FROM lots
                WHERE product_id = ?1
                ORDER BY purchase_date DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(product.id)
            .fetch_optional(&mut *tx)
            .await?;
            let price = match price {
                Some(cents) => cents,
                None => return Err(CoreError::insufficient(entity, line.quantity, 0).into()),
            };

            let rows: Vec<(i64, i64, chrono::NaiveDate, i64)> = sqlx::query_as(
                r#"
                SELECT i.id, i.lot_id, l.purchase_date, i.quantity
                FROM inventory i
                JOIN lots l ON l.id = i.lot_id
                WHERE i.warehouse_id = ?1 AND i.product_id = ?2 AND i.quantity > 0
                  AND (l.expired_date IS NULL OR l.expired_date >= ?3)
                ORDER BY l.purchase_date, l.id, i.id
                "#,
            )
            .bind(store_wh.id)
            .bind(product.id)
            .bind(sale_day)
            .fetch_all(&mut *tx)
            .await?;
            let slots = rows
                .into_iter()
                .map(|(key, lot_id, purchase_date, available)| StockSlot {
                    key,
                    lot_id,
                    purchase_date,
                    available,
                })
                .collect();

            let plan = fifo::plan(slots, line.quantity);
            if !plan.is_satisfied() {
                warn!(
                    tenant_id,
                    product_id = product.id,
                    requested = line.quantity,
                    available = plan.allocated(),
                    "Sale rejected, insufficient store stock"
                );
                return Err(
                    CoreError::insufficient(entity, line.quantity, plan.allocated()).into(),
                );
            }

            for take in &plan.takes {
                let row: Inventory = fetch_scoped(&mut *tx, take.key, tenant_id).await?;
                deduct_quantity(&mut *tx, row.id, take.quantity).await?;

                let detail: SaleDetail = sqlx::query_as(
                    r#"
                    INSERT INTO sale_details (
                        tenant_id, sale_id, product_id, variant_id, lot_id, inventory_id,
                        quantity_sold, price_at_sale_cents, currency
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    RETURNING *
                    "#,
                )
                .bind(tenant_id)
                .bind(sale.id)
                .bind(product.id)
                .bind(row.variant_id)
                .bind(row.lot_id)
                .bind(row.id)
                .bind(take.quantity)
                .bind(price)
                .bind(product.currency)
                .fetch_one(&mut *tx)
                .await?;
                details.push(detail);
            }
        }

        let totals = Settlement::from_details(&details, Money::zero(), &rates, sale.currency);
        let mut paid = Money::zero();
        for payment in &req.payments {
            let amount = rates.convert(payment.amount, payment.currency, sale.currency);
            ensure_within_total(sale.id, totals.grand_total, paid, amount)?;
            insert_payment(&mut *tx, &sale, payment).await?;
            paid += amount;
        }

        let sale = write_settlement(&mut *tx, &sale, None).await?;
        let full = load_full(&mut *tx, sale).await?;

        tx.commit().await?;

        info!(
            tenant_id,
            sale_id = full.sale.id,
            receipt = %full.sale.receipt_number,
            grand_total = full.sale.grand_total_cents,
            status = full.sale.payment_status.as_str(),
            "Sale processed"
        );
        Ok(full)
    }

    /// Adds a payment to an open sale.
    ///
    /// The amount is converted at the sale's frozen rate, never a newer one.
    ///
    /// ## Returns
    /// * `Overpayment` - the payment would take the amount paid past the
    ///   grand total
    pub async fn add_payment(
        &self,
        tenant_id: i64,
        sale_id: i64,
        req: &PaymentRequest,
    ) -> DbResult<(Payment, Sale)> {
        validate_payment(req)?;
        debug!(sale_id, amount = req.amount.cents(), currency = ?req.currency, "Recording payment");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let sale = open_sale(&mut *tx, tenant_id, sale_id, "add payment").await?;
        let rates = sale_rates(&sale)?;
        let payments = load_payments(&mut *tx, sale.id).await?;
        let paid = settlement::amount_paid(&payments, &rates, sale.currency);
        let amount = rates.convert(req.amount, req.currency, sale.currency);
        ensure_within_total(sale.id, sale.grand_total(), paid, amount)?;

        let payment = insert_payment(&mut *tx, &sale, req).await?;
        let sale = write_settlement(&mut *tx, &sale, None).await?;

        tx.commit().await?;

        info!(
            tenant_id,
            sale_id,
            payment_id = payment.id,
            method = payment.method.as_str(),
            balance_due = sale.balance_due_cents,
            "Payment added"
        );
        Ok((payment, sale))
    }

    /// Applies the settlement result of a `Processing` payment.
    ///
    /// ## What This Does
    /// Stores the new status and re-aggregates the sale. When every payment
    /// has failed or been cancelled, the sale's stock goes back to the store
    /// and a `payment_failed` cancellation entry is written.
    ///
    /// ## Returns
    /// * `InvalidState` - the payment is not processing, or the sale is closed
    pub async fn update_payment_status(
        &self,
        tenant_id: i64,
        update: &PaymentStatusUpdate,
    ) -> DbResult<Sale> {
        if update.status == PaymentStatus::Processing {
            return Err(ValidationError::InvalidFormat {
                field: "payment status".to_string(),
                reason: "must be a settled status".to_string(),
            }
            .into());
        }
        if let Some(reference) = &update.reference {
            validate_text("payment reference", reference, 100)?;
        }
        debug!(
            tenant_id,
            payment_id = update.payment_id,
            status = ?update.status,
            "Updating payment status"
        );

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let payment: Payment = fetch_scoped(&mut *tx, update.payment_id, tenant_id).await?;
        if payment.status != PaymentStatus::Processing {
            return Err(CoreError::invalid_state(
                "Payment",
                payment.id,
                payment.status.as_str(),
                "update status",
            )
            .into());
        }
        let sale = open_sale(&mut *tx, tenant_id, payment.sale_id, "update payment").await?;

        sqlx::query(
            r#"
            UPDATE payments SET status = ?2, reference = COALESCE(?3, reference), updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(payment.id)
        .bind(update.status)
        .bind(update.reference.as_deref())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let payments = load_payments(&mut *tx, sale.id).await?;
        let status = settlement::aggregate_status(payments.iter().map(|p| p.status));

        if status == PaymentStatus::Failed {
            let entries = restore_all(&mut *tx, sale.id).await?;
            append_cancellation_log(
                &mut *tx,
                &sale,
                CancellationKind::PaymentFailed,
                SETTLEMENT_ACTOR,
                Some("all payments failed"),
                Money::zero(),
                &entries,
            )
            .await?;
            warn!(
                tenant_id,
                sale_id = sale.id,
                lines = entries.len(),
                "All payments failed, sale reversed"
            );
        }

        let sale = write_settlement(&mut *tx, &sale, Some(status)).await?;
        tx.commit().await?;

        info!(
            tenant_id,
            payment_id = payment.id,
            status = update.status.as_str(),
            sale_status = sale.payment_status.as_str(),
            "Payment status updated"
        );
        Ok(sale)
    }

    /// Cancels a whole sale.
    ///
    /// ## What This Does
    /// 1. Every active unit goes back to the store row it came from
    /// 2. Completed payments are refunded in full, split proportionally with
    ///    the exact remainder on the last payment
    /// 3. Processing payments are cancelled
    /// 4. The sale becomes `Cancelled` and a `full` entry is logged
    ///
    /// ## Returns
    /// * `InvalidState` - the sale is already cancelled or failed
    pub async fn cancel_sale(
        &self,
        tenant_id: i64,
        sale_id: i64,
        cancelled_by: &str,
        reason: Option<&str>,
    ) -> DbResult<(SaleWithDetails, SaleCancellationLog)> {
        validate_text("cancelled by", cancelled_by, 100)?;
        debug!(tenant_id, sale_id, cancelled_by, "Cancelling sale");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let sale = open_sale(&mut *tx, tenant_id, sale_id, "cancel").await?;
        let entries = restore_all(&mut *tx, sale.id).await?;

        let payments = load_payments(&mut *tx, sale.id).await?;
        let completed: Vec<Payment> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .cloned()
            .collect();
        let rates = sale_rates(&sale)?;
        let owed: Money = completed
            .iter()
            .map(|p| rates.convert(p.unrefunded(), p.currency, sale.currency))
            .sum();
        let (refunds, refund_total) =
            issue_refunds(&mut *tx, &sale, &completed, owed, cancelled_by.trim(), reason).await?;

        sqlx::query(
            r#"
            UPDATE payments SET status = ?2, updated_at = ?3
            WHERE sale_id = ?1 AND status = ?4
            "#,
        )
        .bind(sale.id)
        .bind(PaymentStatus::Cancelled)
        .bind(Utc::now())
        .bind(PaymentStatus::Processing)
        .execute(&mut *tx)
        .await?;

        let sale = write_settlement(&mut *tx, &sale, Some(PaymentStatus::Cancelled)).await?;
        let log = append_cancellation_log(
            &mut *tx,
            &sale,
            CancellationKind::Full,
            cancelled_by.trim(),
            reason,
            refund_total,
            &entries,
        )
        .await?;
        let full = load_full(&mut *tx, sale).await?;

        tx.commit().await?;

        info!(
            tenant_id,
            sale_id,
            lines = entries.len(),
            refunds = refunds.len(),
            refund_total = refund_total.cents(),
            "Sale cancelled"
        );
        Ok((full, log))
    }

    /// Cancels part of a sale.
    ///
    /// ## What This Does
    /// 1. Returns each item's quantity to its store row and raises the
    ///    detail's cancelled quantity
    /// 2. Recomputes the totals from what remains active
    /// 3. Refunds only the settled amount now beyond the new grand total,
    ///    across completed payments. Processing payments are never refunded
    ///
    /// ## Returns
    /// * `InvalidQuantity` - an item asks for more than the detail's active
    ///   quantity, or a non-positive quantity
    pub async fn partial_cancel(
        &self,
        tenant_id: i64,
        sale_id: i64,
        items: &[CancelItemRequest],
        cancelled_by: &str,
        reason: Option<&str>,
    ) -> DbResult<(SaleWithDetails, SaleCancellationLog)> {
        validate_text("cancelled by", cancelled_by, 100)?;
        if items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }
        debug!(tenant_id, sale_id, items = items.len(), "Partially cancelling sale");
        let mut seen = HashSet::new();
        for item in items {
            check_movement_quantity("cancelled quantity", item.quantity)?;
            if !seen.insert(item.sale_detail_id) {
                return Err(ValidationError::Duplicate {
                    field: "sale detail".to_string(),
                    value: item.sale_detail_id.to_string(),
                }
                .into());
            }
        }

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let sale = open_sale(&mut *tx, tenant_id, sale_id, "partially cancel").await?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let detail: SaleDetail = fetch_scoped(&mut *tx, item.sale_detail_id, tenant_id).await?;
            if detail.sale_id != sale.id {
                return Err(CoreError::not_found(
                    "SaleDetail",
                    format!("{} of sale {}", detail.id, sale.id),
                )
                .into());
            }
            if item.quantity > detail.active_quantity() {
                return Err(CoreError::InvalidQuantity {
                    entity: format!("sale detail {}", detail.id),
                    quantity: item.quantity,
                    reason: format!("exceeds active quantity {}", detail.active_quantity()),
                }
                .into());
            }
            entries.push(restore_stock(&mut *tx, &detail, item.quantity).await?);
        }

        let reduced = write_settlement(&mut *tx, &sale, None).await?;

        // Only settled money can be handed back.
        let collected: Vec<Payment> = load_payments(&mut *tx, sale.id)
            .await?
            .into_iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .collect();
        let rates = sale_rates(&reduced)?;
        let received: Money = collected
            .iter()
            .map(|p| rates.convert(p.unrefunded(), p.currency, reduced.currency))
            .sum();
        let overpaid = (received - reduced.grand_total()).clamp_non_negative();

        let mut refund_total = Money::zero();
        if overpaid.is_positive() {
            let (_, total) = issue_refunds(
                &mut *tx,
                &reduced,
                &collected,
                overpaid,
                cancelled_by.trim(),
                reason,
            )
            .await?;
            refund_total = total;
        }

        let sale = write_settlement(&mut *tx, &reduced, None).await?;
        let log = append_cancellation_log(
            &mut *tx,
            &sale,
            CancellationKind::Partial,
            cancelled_by.trim(),
            reason,
            refund_total,
            &entries,
        )
        .await?;
        let full = load_full(&mut *tx, sale).await?;

        tx.commit().await?;

        info!(
            tenant_id,
            sale_id,
            lines = entries.len(),
            grand_total = full.sale.grand_total_cents,
            refund_total = refund_total.cents(),
            "Sale partially cancelled"
        );
        Ok((full, log))
    }

    pub async fn get_sale(&self, tenant_id: i64, sale_id: i64) -> DbResult<SaleWithDetails> {
        let mut conn = self.pool.acquire().await?;
        let sale: Sale = fetch_scoped(&mut *conn, sale_id, tenant_id).await?;
        load_full(&mut *conn, sale).await
    }

    /// Sales of the tenant, newest first, optionally for one store.
    pub async fn list_sales(&self, tenant_id: i64, store_id: Option<i64>) -> DbResult<Vec<Sale>> {
        debug!(tenant_id, ?store_id, "Listing sales");
        let sales = sqlx::query_as(
            r#"
            SELECT * FROM sales
            WHERE tenant_id = ?1 AND (?2 IS NULL OR store_id = ?2)
            ORDER BY sale_date DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn cancellation_logs(
        &self,
        tenant_id: i64,
        sale_id: i64,
    ) -> DbResult<Vec<SaleCancellationLog>> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped::<Sale>(&mut *conn, sale_id, tenant_id).await?;
        let logs = sqlx::query_as(
            "SELECT * FROM sale_cancellation_logs WHERE sale_id = ?1 ORDER BY id",
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(logs)
    }
}
