use serde::Serialize;

use crate::types::LogEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub count: usize,
}

/// Percentiles over every log currently held by the store.
pub fn summarize<'a>(logs: impl IntoIterator<Item = &'a LogEvent>) -> LatencySummary {
    let mut sorted: Vec<u64> = logs.into_iter().map(|l| l.latency).collect();
    if sorted.is_empty() {
        return LatencySummary::default();
    }
    sorted.sort_unstable();
    let n = sorted.len();
    LatencySummary {
        p50_ms: sorted[n * 50 / 100],
        p95_ms: sorted[n * 95 / 100],
        p99_ms: sorted[(n * 99 / 100).min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
        count: n,
    }
}
