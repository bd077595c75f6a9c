use crate::types::{Movement, NormalizedMovement};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    /// Sum of strictly positive amounts.
    pub total_in: f64,
    /// Sum of the remaining amounts; never positive.
    pub total_out: f64,
    pub sum_abs: f64,
    pub count: usize,
}

impl LedgerTotals {
    pub fn average_abs(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_abs / self.count as f64
        }
    }

    pub fn net(&self) -> f64 {
        self.total_in + self.total_out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub movements: Vec<Movement>,
    pub totals: LedgerTotals,
}

/// Order movements chronologically and attach the running balance.
///
/// The sort is stable: movements sharing a timestamp keep their upstream
/// order, which the duplicate rule depends on. The balance starts at zero,
/// so each `dynamic_balance` is the sum of every amount up to and including
/// that movement.
pub fn build(mut normalized: Vec<NormalizedMovement>) -> Ledger {
    normalized.sort_by_key(|m| m.date);

    let mut totals = LedgerTotals::default();
    let mut running = 0.0;

    let movements = normalized
        .into_iter()
        .map(|m| {
            running += m.amount;
            if m.amount > 0.0 {
                totals.total_in += m.amount;
            } else {
                totals.total_out += m.amount;
            }
            totals.sum_abs += m.amount.abs();
            totals.count += 1;

            Movement {
                id: m.id,
                date: m.date,
                amount: m.amount,
                description: m.description,
                movement_type: m.movement_type,
                dynamic_balance: running,
                extra: m.extra,
            }
        })
        .collect();

    Ledger { movements, totals }
}
