use serde::Serialize;

use crate::types::{LogEvent, SystemStatus};

/// Newest logs inspected for server errors.
pub const ERROR_WINDOW: usize = 10;
/// Newest logs inspected for latency.
pub const LATENCY_WINDOW: usize = 5;
/// More server errors than this in the error window is critical.
pub const CRITICAL_ERRORS: usize = 2;
pub const DEGRADED_LATENCY_MS: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: SystemStatus,
    pub recent_errors: usize,
    pub recent_latency: f64,
}

/// Derive the system status from logs ordered newest first.
///
/// The latency mean always divides by [`LATENCY_WINDOW`], so with fewer
/// than five logs the mean is pulled towards zero.
pub fn assess<'a, I>(logs: I) -> HealthReport
where
    I: IntoIterator<Item = &'a LogEvent>,
    I::IntoIter: Clone,
{
    let logs = logs.into_iter();

    let recent_errors = logs
        .clone()
        .take(ERROR_WINDOW)
        .filter(|l| l.status >= 500)
        .count();
    let recent_latency = logs
        .take(LATENCY_WINDOW)
        .map(|l| l.latency as f64)
        .sum::<f64>()
        / LATENCY_WINDOW as f64;

    let status = if recent_errors > CRITICAL_ERRORS {
        SystemStatus::Critical
    } else if recent_latency > DEGRADED_LATENCY_MS {
        SystemStatus::Degraded
    } else {
        SystemStatus::Ok
    };

    HealthReport { status, recent_errors, recent_latency }
}
