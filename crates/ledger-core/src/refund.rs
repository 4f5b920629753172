//! # Proportional Refund Allocation
//!
//! Splits a refund target across payments in proportion to what each still
//! holds unrefunded.
//!
//! ```text
//!  payments  [30.00, 45.00, 25.00]   total 100.00
//!  target    100.00
//!
//!  share_1 = round(30 * 100 / 100) = 30.00
//!  share_2 = round(45 * 100 / 100) = 45.00
//!  share_3 = target - (30 + 45)    = 25.00   ◄ last gets the exact remainder
//! ```
//!
//! Payments with nothing left to refund are skipped. The sum of shares is
//! always exactly `min(target, total_available)`, and no share exceeds its
//! payment's available balance.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A payment's refundable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refundable {
    pub payment_id: i64,
    pub available: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundShare {
    pub payment_id: i64,
    pub amount: Money,
}

/// Allocates `target` across `payments`, in iteration order.
///
/// ## Example
/// ```rust
/// use ledger_core::money::Money;
/// use ledger_core::refund::{allocate, Refundable};
///
/// let payments = [
///     Refundable { payment_id: 1, available: Money::from_cents(3000) },
///     Refundable { payment_id: 2, available: Money::from_cents(4500) },
///     Refundable { payment_id: 3, available: Money::from_cents(2500) },
/// ];
/// let shares = allocate(&payments, Money::from_cents(10000));
/// let sum: Money = shares.iter().map(|s| s.amount).sum();
/// assert_eq!(sum.cents(), 10000);
/// ```
pub fn allocate(payments: &[Refundable], target: Money) -> Vec<RefundShare> {
    let eligible: Vec<&Refundable> = payments
        .iter()
        .filter(|p| p.available.is_positive())
        .collect();
    if eligible.is_empty() || !target.is_positive() {
        return Vec::new();
    }

    let total: Money = eligible.iter().map(|p| p.available).sum();
    let target = target.min(total);

    let last = eligible.len() - 1;
    let mut amounts: Vec<Money> = Vec::with_capacity(eligible.len());
    let mut allocated = Money::zero();
    for (i, p) in eligible.iter().enumerate() {
        let share = if i == last {
            target - allocated
        } else {
            p.available.scale(target.cents(), total.cents())
        };
        allocated += share;
        amounts.push(share);
    }

    rebalance_last(&eligible, &mut amounts);

    eligible
        .iter()
        .zip(amounts)
        .filter(|(_, amount)| amount.is_positive())
        .map(|(p, amount)| RefundShare {
            payment_id: p.payment_id,
            amount,
        })
        .collect()
}

/// Pulls the remainder back inside `[0, available]` for the last payment.
///
/// The last payment takes the exact remainder whenever it fits. Rounding of
/// earlier shares can leave it a few cents above the last payment's balance
/// or below zero. Only then does the difference move to earlier payments,
/// walking backwards within each one's headroom, so the sum is unchanged and
/// no payment is refunded more than it holds.
fn rebalance_last(eligible: &[&Refundable], amounts: &mut [Money]) {
    let last = amounts.len() - 1;
    let cap = eligible[last].available;

    if amounts[last] > cap {
        let mut excess = amounts[last] - cap;
        amounts[last] = cap;
        for i in (0..last).rev() {
            if excess.is_zero() {
                break;
            }
            let headroom = eligible[i].available - amounts[i];
            let moved = excess.min(headroom);
            amounts[i] += moved;
            excess -= moved;
        }
    } else if amounts[last].is_negative() {
        let mut deficit = -amounts[last];
        amounts[last] = Money::zero();
        for i in (0..last).rev() {
            if deficit.is_zero() {
                break;
            }
            let moved = deficit.min(amounts[i]);
            amounts[i] -= moved;
            deficit -= moved;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn refundable(payment_id: i64, cents: i64) -> Refundable {
        Refundable {
            payment_id,
            available: Money::from_cents(cents),
        }
    }

    fn sum(shares: &[RefundShare]) -> i64 {
        shares.iter().map(|s| s.amount.cents()).sum()
    }

    #[test]
    fn test_full_refund_is_exact() {
        let payments = [refundable(1, 3000), refundable(2, 4500), refundable(3, 2500)];
        let shares = allocate(&payments, Money::from_cents(10000));
        assert_eq!(sum(&shares), 10000);
        for (share, p) in shares.iter().zip(payments.iter()) {
            assert!(share.amount <= p.available);
        }
    }

    #[test]
    fn test_thirds_remainder_goes_last() {
        let payments = [refundable(1, 100), refundable(2, 100), refundable(3, 100)];
        let shares = allocate(&payments, Money::from_cents(100));
        assert_eq!(shares[0].amount.cents(), 33);
        assert_eq!(shares[1].amount.cents(), 33);
        assert_eq!(shares[2].amount.cents(), 34);
    }

    #[test]
    fn test_partial_refund_proportional() {
        // 10.00 out of 40.00 paid by 30 + 10
        let payments = [refundable(1, 3000), refundable(2, 1000)];
        let shares = allocate(&payments, Money::from_cents(1000));
        assert_eq!(shares[0].amount.cents(), 750);
        assert_eq!(shares[1].amount.cents(), 250);
    }

    #[test]
    fn test_zero_available_skipped() {
        let payments = [refundable(1, 0), refundable(2, 500)];
        let shares = allocate(&payments, Money::from_cents(500));
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].payment_id, 2);
    }

    #[test]
    fn test_target_capped_at_available() {
        let payments = [refundable(1, 500)];
        let shares = allocate(&payments, Money::from_cents(900));
        assert_eq!(sum(&shares), 500);
    }

    #[test]
    fn test_last_share_never_exceeds_available() {
        // 2.4 rounds down three times, leaving 2 for a payment holding 1
        let payments = [
            refundable(1, 3),
            refundable(2, 3),
            refundable(3, 3),
            refundable(4, 1),
        ];
        let shares = allocate(&payments, Money::from_cents(8));
        assert_eq!(sum(&shares), 8);
        let amounts: Vec<i64> = shares.iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![2, 2, 3, 1]);
    }

    #[test]
    fn test_last_share_never_negative() {
        // 2.5 rounds up three times, overshooting the target by one
        let payments = [
            refundable(1, 5),
            refundable(2, 5),
            refundable(3, 5),
            refundable(4, 1),
        ];
        let shares = allocate(&payments, Money::from_cents(8));
        assert_eq!(sum(&shares), 8);
        let amounts: Vec<i64> = shares.iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![3, 3, 2]);
    }

    #[test]
    fn test_nothing_to_refund() {
        assert!(allocate(&[refundable(1, 100)], Money::zero()).is_empty());
        assert!(allocate(&[], Money::from_cents(100)).is_empty());
    }
}
