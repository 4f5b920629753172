//! # Exchange Rate Repository
//!
//! USD → LRD rates per tenant. A sale freezes the latest rate at creation;
//! later rates never change an existing sale.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::lock_tenant;
use ledger_core::{CoreError, ExchangeRate, RateBook};

/// Latest rate by effective date, ties broken by insertion order.
pub(crate) async fn latest_rate(
    conn: &mut SqliteConnection,
    tenant_id: i64,
) -> DbResult<Option<ExchangeRate>> {
    let rate = sqlx::query_as(
        r#"
        SELECT * FROM exchange_rates
        WHERE tenant_id = ?1
        ORDER BY effective_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(rate)
}

/// The latest rate as a [`RateBook`], or a configuration error.
pub(crate) async fn current_rate_book(
    conn: &mut SqliteConnection,
    tenant_id: i64,
) -> DbResult<RateBook> {
    let rate = latest_rate(conn, tenant_id).await?.ok_or_else(|| {
        CoreError::Configuration(format!("tenant {} has no exchange rate", tenant_id))
    })?;
    Ok(RateBook::new(rate.usd_rate)?)
}

/// Repository for exchange rate operations.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    pool: SqlitePool,
}

impl ExchangeRateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExchangeRateRepository { pool }
    }

    /// Records a rate effective from `effective_date`.
    ///
    /// ## Arguments
    /// * `usd_rate` - LRD per USD in hundredths (200.00 → 20000)
    ///
    /// ## Returns
    /// * `UniqueViolation` when the tenant already has a rate for that date
    pub async fn add_rate(
        &self,
        tenant_id: i64,
        usd_rate: i64,
        effective_date: NaiveDate,
    ) -> DbResult<ExchangeRate> {
        RateBook::new(usd_rate)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let rate: ExchangeRate = sqlx::query_as(
            r#"
            INSERT INTO exchange_rates (tenant_id, usd_rate, effective_date, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(usd_rate)
        .bind(effective_date)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant_id, usd_rate, %effective_date, "Exchange rate recorded");
        Ok(rate)
    }

    pub async fn latest_rate(&self, tenant_id: i64) -> DbResult<Option<ExchangeRate>> {
        let mut conn = self.pool.acquire().await?;
        latest_rate(&mut *conn, tenant_id).await
    }

    /// All rates of the tenant, newest first.
    pub async fn list_rates(&self, tenant_id: i64) -> DbResult<Vec<ExchangeRate>> {
        let rates = sqlx::query_as(
            "SELECT * FROM exchange_rates WHERE tenant_id = ?1 ORDER BY effective_date DESC, id DESC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rates)
    }
}
