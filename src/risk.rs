use std::collections::HashMap;

use crate::ledger::Ledger;
use crate::types::{Movement, Risk, RiskKind};

pub const DUPLICATE_SUFFIX: &str = " (Possible Duplicate)";

/// Heuristic risk rules run over a finished ledger.
///
/// Both rules look at the whole load at once: the high-value rule compares
/// every movement against the ledger-wide mean magnitude (the movement
/// itself included), and the duplicate rule only compares neighbours in
/// chronological order.
#[derive(Debug, Clone)]
pub struct RiskDetector {
    pub high_value_multiplier: f64,
}

impl Default for RiskDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskDetector {
    pub fn new() -> Self {
        Self { high_value_multiplier: 3.0 }
    }

    /// High-value risks first, then duplicates. A movement matching both
    /// rules is reported twice.
    pub fn evaluate(&self, ledger: &Ledger) -> Vec<Risk> {
        let mut risks = self.evaluate_high_value(&ledger.movements, ledger.totals.average_abs());
        risks.extend(self.evaluate_duplicates(&ledger.movements));
        risks
    }

    pub fn evaluate_high_value(&self, movements: &[Movement], average_abs: f64) -> Vec<Risk> {
        let threshold = average_abs * self.high_value_multiplier;
        movements
            .iter()
            .filter(|m| m.amount.abs() > threshold)
            .map(|m| Risk { risk_kind: RiskKind::HighValue, movement: m.clone() })
            .collect()
    }

    /// Flags the later movement of each adjacent pair with the same amount
    /// and description. A repeat separated by any other movement is missed.
    pub fn evaluate_duplicates(&self, movements: &[Movement]) -> Vec<Risk> {
        movements
            .windows(2)
            .filter(|pair| pair[0].amount == pair[1].amount && pair[0].description == pair[1].description)
            .map(|pair| {
                let mut flagged = pair[1].clone();
                flagged.description.push_str(DUPLICATE_SUFFIX);
                Risk { risk_kind: RiskKind::Duplicate, movement: flagged }
            })
            .collect()
    }
}

pub fn risk_counts(risks: &[Risk]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for risk in risks {
        *counts.entry(risk.risk_kind.label().to_string()).or_insert(0) += 1;
    }
    counts
}
