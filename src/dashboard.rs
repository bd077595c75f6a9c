use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::analytics::Analytics;
use crate::error::FetchError;
use crate::fetch::{MonitoredFetch, Transport};
use crate::filter::MovementFilter;
use crate::monitor::Monitor;
use crate::types::{FinancialStats, Movement, RejectedMovement};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub account_id: String,
    pub balance: Option<f64>,
    pub ledger: Vec<Movement>,
    pub stats: FinancialStats,
    pub rejected: Vec<RejectedMovement>,
    pub loaded_at: DateTime<Utc>,
}

/// Runs the two-step account load through a monitored transport.
pub struct DashboardLoader<T> {
    fetch: MonitoredFetch<T>,
    account_id: String,
    analytics: Analytics,
}

impl<T: Transport> DashboardLoader<T> {
    pub fn new(fetch: MonitoredFetch<T>, account_id: impl Into<String>, analytics: Analytics) -> Self {
        Self { fetch, account_id: account_id.into(), analytics }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        self.fetch.monitor()
    }

    pub fn balance_endpoint(&self) -> String {
        format!("/api/accounts/{}/balance", self.account_id)
    }

    pub fn movements_endpoint(&self) -> String {
        format!("/api/accounts/{}/movements", self.account_id)
    }

    /// Balance first, then movements. A failure in either aborts the whole
    /// load, so a balance failure means movements are never requested.
    pub async fn load(&self) -> Result<DashboardSnapshot, FetchError> {
        let balance_body = self.fetch.fetch(&self.balance_endpoint()).await?;
        let balance = read_balance(&balance_body);

        let movements_body = self.fetch.fetch(&self.movements_endpoint()).await?;
        let processed = self.analytics.process(&movements_body);

        for rejected in &processed.rejected {
            warn!(account = %self.account_id, index = rejected.index, reason = %rejected.reason, "skipped movement record");
        }

        Ok(DashboardSnapshot {
            account_id: self.account_id.clone(),
            balance,
            ledger: processed.ledger,
            stats: processed.stats,
            rejected: processed.rejected,
            loaded_at: Utc::now(),
        })
    }
}

/// `balance` as a number or numeric string; anything else is unknown.
pub fn read_balance(body: &Value) -> Option<f64> {
    match body.get("balance")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|b| b.is_finite()),
        _ => None,
    }
}

/// The last successfully loaded snapshot, kept across failed refreshes.
///
/// Refreshes run one at a time, so `current` always holds the result of
/// the most recently started load that succeeded.
pub struct Dashboard<T> {
    loader: DashboardLoader<T>,
    current: RwLock<Option<Arc<DashboardSnapshot>>>,
    loading: AtomicBool,
    refresh_lock: Mutex<()>,
}

impl<T: Transport> Dashboard<T> {
    pub fn new(loader: DashboardLoader<T>) -> Self {
        Self {
            loader,
            current: RwLock::new(None),
            loading: AtomicBool::new(true),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn loader(&self) -> &DashboardLoader<T> {
        &self.loader
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        self.loader.monitor()
    }

    /// True until the first load attempt finishes, whatever its outcome.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Option<Arc<DashboardSnapshot>> {
        self.current.read().clone()
    }

    /// Reload the account. On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<DashboardSnapshot>, FetchError> {
        let _serialized = self.refresh_lock.lock().await;
        let result = self.loader.load().await;
        self.loading.store(false, Ordering::Release);

        match result {
            Ok(snapshot) => {
                info!(
                    account = %snapshot.account_id,
                    movements = snapshot.ledger.len(),
                    risks = snapshot.stats.risks.len(),
                    "dashboard loaded"
                );
                let snapshot = Arc::new(snapshot);
                *self.current.write() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                error!(account = %self.loader.account_id(), error = %e, "dashboard load failed");
                Err(e)
            }
        }
    }

    /// Current ledger narrowed by `filter`; empty before the first load.
    pub fn filtered(&self, filter: &MovementFilter) -> Vec<Movement> {
        self.current()
            .map(|snapshot| filter.apply(&snapshot.ledger))
            .unwrap_or_default()
    }
}
