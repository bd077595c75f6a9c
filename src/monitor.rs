use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::health::{self, HealthReport};
use crate::latency::{self, LatencySummary};
use crate::logstore::LogStore;
use crate::types::{LogEvent, LogType, NewLogEvent, SystemStatus};

const UPDATE_CAPACITY: usize = 64;

/// Everything the monitor panel shows, captured at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub logs: Vec<LogEvent>,
    pub health: HealthReport,
    pub latency: LatencySummary,
}

/// The monitoring session: the log store plus the status derived from it.
///
/// One instance is shared (via `Arc`) by every component that records or
/// displays observations. Each append is an atomic
/// read-modify-write-persist under the store lock, and the fresh snapshot
/// is broadcast before the lock is released.
pub struct Monitor {
    store: Mutex<LogStore>,
    tx: broadcast::Sender<MonitorSnapshot>,
}

impl Monitor {
    pub fn new(store: LogStore) -> Self {
        let (tx, _) = broadcast::channel(UPDATE_CAPACITY);
        Self { store: Mutex::new(store), tx }
    }

    pub fn in_memory() -> Self {
        Self::new(LogStore::in_memory())
    }

    pub fn append(&self, event: NewLogEvent) -> LogEvent {
        let mut store = self.store.lock();
        let stamped = store.append(event);
        // Sent under the lock so subscribers see snapshots in append order.
        // No subscribers is fine.
        let _ = self.tx.send(snapshot_of(&store));
        stamped
    }

    /// Inject a synthetic server failure, for exercising the status panel.
    pub fn simulate_failure(&self) -> LogEvent {
        self.append(NewLogEvent {
            endpoint: "/api/simulated-crash".to_string(),
            status: 500,
            latency: 4500,
            log_type: LogType::Error,
            message: "Simulated Critical Failure".to_string(),
        })
    }

    pub fn logs(&self) -> Vec<LogEvent> {
        self.store.lock().logs().iter().cloned().collect()
    }

    pub fn health(&self) -> HealthReport {
        health::assess(self.store.lock().logs())
    }

    pub fn status(&self) -> SystemStatus {
        self.health().status
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        snapshot_of(&self.store.lock())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorSnapshot> {
        self.tx.subscribe()
    }
}

fn snapshot_of(store: &LogStore) -> MonitorSnapshot {
    MonitorSnapshot {
        logs: store.logs().iter().cloned().collect(),
        health: health::assess(store.logs()),
        latency: latency::summarize(store.logs()),
    }
}
