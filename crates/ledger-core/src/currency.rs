//! # Currency Conversion
//!
//! Converts between USD and LRD through one exchange rate.
//!
//! ```text
//!  usd_rate = LRD per USD in hundredths (200.00 → 20000)
//!
//!  USD → LRD : cents * usd_rate / 100
//!  LRD → USD : cents * 100 / usd_rate
//!
//!  both rounded half away from zero
//! ```
//!
//! A sale freezes the rate it was created with. Every later conversion for
//! that sale (payments, refunds, recomputed totals) goes through the frozen
//! rate, never a fresh one.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{div_round_half_away, Money};
use crate::types::Currency;
use crate::validation::ValidationResult;

/// Scale of a stored rate: hundredths of an LRD per USD.
pub const RATE_SCALE: i64 = 100;

/// A validated, positive USD/LRD exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBook {
    usd_rate: i64,
}

impl RateBook {
    /// Wraps a stored rate.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::currency::RateBook;
    ///
    /// assert!(RateBook::new(20000).is_ok());
    /// assert!(RateBook::new(0).is_err());
    /// ```
    pub fn new(usd_rate: i64) -> ValidationResult<Self> {
        if usd_rate <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "usd_rate".to_string(),
            });
        }
        Ok(Self { usd_rate })
    }

    #[inline]
    pub fn usd_rate(&self) -> i64 {
        self.usd_rate
    }

    /// Converts `amount` from one currency to another.
    ///
    /// ## Example
    /// ```rust
    /// use ledger_core::currency::RateBook;
    /// use ledger_core::money::Money;
    /// use ledger_core::types::Currency;
    ///
    /// let rates = RateBook::new(20000).unwrap();
    /// let usd = rates.convert(Money::from_cents(200000), Currency::Lrd, Currency::Usd);
    /// assert_eq!(usd.cents(), 1000); // 2000 LRD = 10 USD
    /// ```
    pub fn convert(&self, amount: Money, from: Currency, to: Currency) -> Money {
        let cents = amount.cents() as i128;
        let rate = self.usd_rate as i128;
        let scale = RATE_SCALE as i128;
        let converted = match (from, to) {
            (Currency::Usd, Currency::Lrd) => div_round_half_away(cents * rate, scale),
            (Currency::Lrd, Currency::Usd) => div_round_half_away(cents * scale, rate),
            _ => cents,
        };
        Money::from_cents(converted as i64)
    }

    /// Grand total in `settlement` currency from the two subtotals.
    ///
    /// The subtotal already in the settlement currency is taken as is; only
    /// the other one is converted.
    pub fn grand_total(&self, total_usd: Money, total_lrd: Money, settlement: Currency) -> Money {
        match settlement {
            Currency::Usd => total_usd + self.convert(total_lrd, Currency::Lrd, Currency::Usd),
            Currency::Lrd => total_lrd + self.convert(total_usd, Currency::Usd, Currency::Lrd),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> RateBook {
        RateBook::new(20000).unwrap()
    }

    #[test]
    fn test_same_currency_is_identity() {
        let m = Money::from_cents(1234);
        assert_eq!(rates().convert(m, Currency::Usd, Currency::Usd), m);
        assert_eq!(rates().convert(m, Currency::Lrd, Currency::Lrd), m);
    }

    #[test]
    fn test_usd_to_lrd() {
        let lrd = rates().convert(Money::from_cents(1000), Currency::Usd, Currency::Lrd);
        assert_eq!(lrd.cents(), 200000);
    }

    #[test]
    fn test_lrd_to_usd_rounds() {
        // 1.01 LRD / 200 = 0.00505 USD → 0.01
        let usd = rates().convert(Money::from_cents(101), Currency::Lrd, Currency::Usd);
        assert_eq!(usd.cents(), 1);
        // 0.99 LRD / 200 = 0.00495 USD → 0.00
        let usd = rates().convert(Money::from_cents(99), Currency::Lrd, Currency::Usd);
        assert_eq!(usd.cents(), 0);
    }

    #[test]
    fn test_fractional_rate() {
        // 187.50 LRD per USD
        let rates = RateBook::new(18750).unwrap();
        let lrd = rates.convert(Money::from_cents(200), Currency::Usd, Currency::Lrd);
        assert_eq!(lrd.cents(), 37500);
    }

    #[test]
    fn test_mixed_currency_grand_total() {
        // 10 USD + 2000 LRD at 200 = 20 USD
        let total = rates().grand_total(
            Money::from_cents(1000),
            Money::from_cents(200000),
            Currency::Usd,
        );
        assert_eq!(total.cents(), 2000);

        let total_lrd = rates().grand_total(
            Money::from_cents(1000),
            Money::from_cents(200000),
            Currency::Lrd,
        );
        assert_eq!(total_lrd.cents(), 400000);
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(RateBook::new(-1).is_err());
    }
}
