use crate::types::Movement;

pub const TOP_N: usize = 5;

/// The `n` largest movements by magnitude. Ties keep ledger order.
pub fn top_by_magnitude(movements: &[Movement], n: usize) -> Vec<Movement> {
    let mut ranked: Vec<&Movement> = movements.iter().collect();
    ranked.sort_by(|a, b| b.amount.abs().total_cmp(&a.amount.abs()));
    ranked.into_iter().take(n).cloned().collect()
}
