//! # Report Repository
//!
//! Read-only aggregations over sales. Rendering is left to callers.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use ledger_core::{LotSalesRow, SalesReportFilter, ValidationError};

/// Repository for sales reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Units and revenue per store, product, lot, day and line currency.
    ///
    /// Only active quantities count: cancelled units are excluded, so fully
    /// cancelled or reversed sales drop out. Revenue is in the line
    /// currency. The payment method filter keeps sales with at least one
    /// payment of that method.
    ///
    /// ## Arguments
    /// * `filter` - Every field is optional; `from`/`to` are inclusive days
    pub async fn lot_sales_report(
        &self,
        tenant_id: i64,
        filter: &SalesReportFilter,
    ) -> DbResult<Vec<LotSalesRow>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "report range".to_string(),
                    reason: format!("{} is after {}", from, to),
                }
                .into());
            }
        }

        debug!(tenant_id, ?filter, "Building lot sales report");

        let rows = sqlx::query_as(
            r#"
            SELECT
                s.store_id,
                d.product_id,
                p.name AS product_name,
                d.lot_id,
                l.lot_number,
                substr(s.sale_date, 1, 10) AS sale_day,
                d.currency,
                SUM(d.quantity_sold - d.cancelled_quantity) AS quantity,
                SUM((d.quantity_sold - d.cancelled_quantity) * d.price_at_sale_cents) AS revenue_cents
            FROM sale_details d
            JOIN sales s ON s.id = d.sale_id
            JOIN products p ON p.id = d.product_id
            JOIN lots l ON l.id = d.lot_id
            WHERE d.tenant_id = ?1
              AND d.quantity_sold > d.cancelled_quantity
              AND (?2 IS NULL OR substr(s.sale_date, 1, 10) >= ?2)
              AND (?3 IS NULL OR substr(s.sale_date, 1, 10) <= ?3)
              AND (?4 IS NULL OR s.store_id = ?4)
              AND (?5 IS NULL OR d.currency = ?5)
              AND (?6 IS NULL OR s.cashier_id = ?6)
              AND (?7 IS NULL OR EXISTS (
                    SELECT 1 FROM payments pm WHERE pm.sale_id = s.id AND pm.method = ?7
                  ))
            GROUP BY s.store_id, d.product_id, d.lot_id, sale_day, d.currency
            ORDER BY sale_day, s.store_id, d.product_id, d.lot_id, d.currency
            "#,
        )
        .bind(tenant_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.store_id)
        .bind(filter.currency)
        .bind(filter.cashier_id.as_deref())
        .bind(filter.payment_method)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
