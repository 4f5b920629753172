//! # Settlement
//!
//! Pure sale arithmetic: subtotals per currency, grand total in the
//! settlement currency, amount paid, balance due, and payment status
//! aggregation.
//!
//! ```text
//!  details ──► total_usd, total_lrd ──(frozen rate)──► grand_total
//!  payments ─► amount_paid (Completed + Processing, net of refunds)
//!
//!  balance_due = max(grand_total - amount_paid, 0)
//!  overpaid    = max(amount_paid - grand_total, 0)
//! ```

use serde::{Deserialize, Serialize};

use crate::currency::RateBook;
use crate::money::Money;
use crate::types::{Currency, Payment, PaymentStatus, SaleDetail};

/// Monetary state of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total_usd: Money,
    pub total_lrd: Money,
    pub grand_total: Money,
    pub amount_paid: Money,
    pub balance_due: Money,
}

impl Settlement {
    /// Computes the settlement for priced lines and an amount already paid.
    ///
    /// ## Arguments
    /// * `lines` - `(currency, line_total)` pairs
    /// * `amount_paid` - already expressed in `currency`
    /// * `rates` - the sale's frozen rate
    /// * `currency` - settlement currency
    pub fn compute<I>(lines: I, amount_paid: Money, rates: &RateBook, currency: Currency) -> Self
    where
        I: IntoIterator<Item = (Currency, Money)>,
    {
        let mut total_usd = Money::zero();
        let mut total_lrd = Money::zero();
        for (line_currency, total) in lines {
            match line_currency {
                Currency::Usd => total_usd += total,
                Currency::Lrd => total_lrd += total,
            }
        }
        let grand_total = rates.grand_total(total_usd, total_lrd, currency);
        Settlement {
            total_usd,
            total_lrd,
            grand_total,
            amount_paid,
            balance_due: (grand_total - amount_paid).clamp_non_negative(),
        }
    }

    /// Settlement from the active quantities of sale details.
    pub fn from_details(
        details: &[SaleDetail],
        amount_paid: Money,
        rates: &RateBook,
        currency: Currency,
    ) -> Self {
        Self::compute(
            details.iter().map(|d| (d.currency, d.active_total())),
            amount_paid,
            rates,
            currency,
        )
    }

    /// Amount paid beyond the grand total.
    pub fn overpaid(&self) -> Money {
        (self.amount_paid - self.grand_total).clamp_non_negative()
    }
}

/// Net amount a payment contributes towards a sale, in its own currency.
///
/// Failed and Cancelled payments contribute nothing.
pub fn contribution(payment: &Payment) -> Money {
    match payment.status {
        PaymentStatus::Completed | PaymentStatus::Processing => payment.unrefunded(),
        PaymentStatus::Failed | PaymentStatus::Cancelled => Money::zero(),
    }
}

/// Sum of contributions converted into `currency` at the frozen rate.
pub fn amount_paid(payments: &[Payment], rates: &RateBook, currency: Currency) -> Money {
    payments
        .iter()
        .map(|p| rates.convert(contribution(p), p.currency, currency))
        .sum()
}

/// Sale payment status from its payments.
///
/// ```text
///  no payments             → Processing
///  all Completed           → Completed
///  all Failed / Cancelled  → Failed
///  anything else           → Processing
/// ```
pub fn aggregate_status<I>(statuses: I) -> PaymentStatus
where
    I: IntoIterator<Item = PaymentStatus>,
{
    let mut any = false;
    let mut all_completed = true;
    let mut all_failed = true;
    for status in statuses {
        any = true;
        all_completed &= status == PaymentStatus::Completed;
        all_failed &= status.is_terminal_failure();
    }

    if !any {
        PaymentStatus::Processing
    } else if all_completed {
        PaymentStatus::Completed
    } else if all_failed {
        PaymentStatus::Failed
    } else {
        PaymentStatus::Processing
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
