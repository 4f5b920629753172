//! # FIFO Allocation
//!
//! Plans how a requested quantity is drawn from a set of lot-bearing rows.
//!
//! ```text
//!  slots sorted by (purchase_date, lot_id) ascending
//!
//!  L1 (2024-01-01) avail 5 ──► take 5
//!  L2 (2024-02-01) avail 5 ──► take 2      requested = 7
//!  L3 (2024-03-01) avail 9 ──► untouched
//! ```
//!
//! The planner is pure: the database layer loads candidate rows, asks for a
//! plan, then applies each take with a guarded decrement. A take that fails
//! at apply time (the row shrank concurrently) aborts the whole transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A row that can contribute units: an inventory row or a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSlot {
    /// Identifier of the row to draw from.
    pub key: i64,
    pub lot_id: i64,
    pub purchase_date: NaiveDate,
    pub available: i64,
}

/// One planned draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Take {
    pub key: i64,
    pub lot_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FifoPlan {
    pub requested: i64,
    pub takes: Vec<Take>,
    /// Units that could not be covered. Zero when the plan is satisfied.
    pub shortfall: i64,
}

impl FifoPlan {
    #[inline]
    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }

    /// Units covered by the takes.
    pub fn allocated(&self) -> i64 {
        self.takes.iter().map(|t| t.quantity).sum()
    }
}

/// Orders slots oldest first: `purchase_date`, then `lot_id`, then `key`.
pub fn sort_oldest_first(slots: &mut [StockSlot]) {
    slots.sort_by_key(|s| (s.purchase_date, s.lot_id, s.key));
}

/// Plans a FIFO draw of `requested` units.
///
/// Slots with nothing available are skipped. Never takes more than a slot
/// holds, never touches a younger slot before an older one is exhausted.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use ledger_core::fifo::{plan, StockSlot};
///
/// let d = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
/// let slots = vec![
///     StockSlot { key: 20, lot_id: 2, purchase_date: d(2), available: 5 },
///     StockSlot { key: 10, lot_id: 1, purchase_date: d(1), available: 5 },
/// ];
/// let p = plan(slots, 7);
/// assert_eq!(p.takes[0].lot_id, 1);
/// assert_eq!(p.takes[0].quantity, 5);
/// assert_eq!(p.takes[1].quantity, 2);
/// assert!(p.is_satisfied());
/// ```
pub fn plan(mut slots: Vec<StockSlot>, requested: i64) -> FifoPlan {
    sort_oldest_first(&mut slots);

    let mut remaining = requested.max(0);
    let mut takes = Vec::new();
    for slot in slots {
        if remaining == 0 {
            break;
        }
        if slot.available <= 0 {
            continue;
        }
        let quantity = remaining.min(slot.available);
        takes.push(Take {
            key: slot.key,
            lot_id: slot.lot_id,
            quantity,
        });
        remaining -= quantity;
    }

    FifoPlan {
        requested,
        takes,
        shortfall: remaining,
    }
}

/// Total units available across slots.
pub fn total_available(slots: &[StockSlot]) -> i64 {
    slots.iter().map(|s| s.available.max(0)).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn slot(key: i64, lot_id: i64, date: NaiveDate, available: i64) -> StockSlot {
        StockSlot {
            key,
            lot_id,
            purchase_date: date,
            available,
        }
    }

    #[test]
    fn test_oldest_lot_exhausted_first() {
        let p = plan(vec![slot(1, 1, d(1, 1), 5), slot(2, 2, d(2, 1), 5)], 7);
        assert_eq!(
            p.takes,
            vec![
                Take { key: 1, lot_id: 1, quantity: 5 },
                Take { key: 2, lot_id: 2, quantity: 2 },
            ]
        );
        assert_eq!(p.allocated(), 7);
    }

    #[test]
    fn test_same_date_orders_by_lot_id() {
        let p = plan(vec![slot(9, 8, d(1, 1), 3), slot(7, 3, d(1, 1), 3)], 4);
        assert_eq!(p.takes[0].lot_id, 3);
        assert_eq!(p.takes[1].lot_id, 8);
        assert_eq!(p.takes[1].quantity, 1);
    }

    #[test]
    fn test_shortfall_reported() {
        let p = plan(vec![slot(1, 1, d(1, 1), 2), slot(2, 2, d(1, 2), 0)], 5);
        assert!(!p.is_satisfied());
        assert_eq!(p.shortfall, 3);
        assert_eq!(p.takes.len(), 1);
    }

    #[test]
    fn test_exact_fit_leaves_younger_untouched() {
        let p = plan(vec![slot(1, 1, d(1, 1), 5), slot(2, 2, d(3, 1), 5)], 5);
        assert_eq!(p.takes.len(), 1);
        assert!(p.is_satisfied());
    }

    #[test]
    fn test_empty_slots() {
        let p = plan(Vec::new(), 1);
        assert_eq!(p.shortfall, 1);
        assert_eq!(total_available(&[]), 0);
    }
}
