//! Raw bank payload in, ordered ledger and aggregate stats out.
//!
//! Everything here is pure: no I/O, no clock, no logging. The same payload
//! always yields the same result.

use serde_json::Value;

use crate::ledger;
use crate::normalize::{self, InvalidAmountPolicy};
use crate::ranking::{self, TOP_N};
use crate::risk::RiskDetector;
use crate::types::{FinancialStats, ProcessedFinancials};

#[derive(Debug, Clone)]
pub struct Analytics {
    pub policy: InvalidAmountPolicy,
    pub detector: RiskDetector,
    pub top_n: usize,
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new(InvalidAmountPolicy::default())
    }
}

impl Analytics {
    pub fn new(policy: InvalidAmountPolicy) -> Self {
        Self { policy, detector: RiskDetector::new(), top_n: TOP_N }
    }

    pub fn process(&self, raw: &Value) -> ProcessedFinancials {
        let Some(normalized) = normalize::normalize(raw, self.policy) else {
            return ProcessedFinancials::default();
        };

        let ledger = ledger::build(normalized.movements);
        let risks = self.detector.evaluate(&ledger);
        let top5 = ranking::top_by_magnitude(&ledger.movements, self.top_n);

        ProcessedFinancials {
            stats: FinancialStats {
                total_in: ledger.totals.total_in,
                total_out: ledger.totals.total_out,
                risks,
                top5,
            },
            ledger: ledger.movements,
            rejected: normalized.rejected,
        }
    }
}

/// [`Analytics::process`] with default settings.
pub fn process(raw: &Value) -> ProcessedFinancials {
    Analytics::default().process(raw)
}
