use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LogStoreError;
use crate::types::{LogEvent, NewLogEvent};

/// Most recent observations kept, in memory and on disk.
pub const LOG_CAPACITY: usize = 50;

/// Fixed key the buffer is persisted under.
pub const STORAGE_KEY: &str = "sys_logs";

/// Bounded, newest-first buffer of monitoring observations.
///
/// When opened against a directory, every append rewrites
/// `<dir>/sys_logs.json` with the truncated buffer.
#[derive(Debug)]
pub struct LogStore {
    logs: VecDeque<LogEvent>,
    path: Option<PathBuf>,
}

impl LogStore {
    pub fn in_memory() -> Self {
        Self { logs: VecDeque::with_capacity(LOG_CAPACITY + 1), path: None }
    }

    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = storage_path(dir.as_ref());
        let logs = Self::load_initial(&path);
        Self { logs, path: Some(path) }
    }

    /// Never fails: a missing file is a fresh start, anything unreadable is
    /// logged and treated the same way.
    pub fn load_initial(path: &Path) -> VecDeque<LogEvent> {
        match read_logs(path) {
            Ok(mut logs) => {
                logs.truncate(LOG_CAPACITY);
                debug!(path = %path.display(), count = logs.len(), "restored monitoring logs");
                logs.into()
            }
            Err(LogStoreError::Io(e)) if e.kind() == ErrorKind::NotFound => VecDeque::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable monitoring logs");
                VecDeque::new()
            }
        }
    }

    pub fn append(&mut self, event: NewLogEvent) -> LogEvent {
        let stamped = LogEvent {
            id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            endpoint: event.endpoint,
            status: event.status,
            latency: event.latency,
            log_type: event.log_type,
            message: event.message,
        };

        self.logs.push_front(stamped.clone());
        self.logs.truncate(LOG_CAPACITY);

        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist monitoring logs");
        }
        stamped
    }

    pub fn logs(&self) -> &VecDeque<LogEvent> {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self) -> Result<(), LogStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&self.logs)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

pub fn storage_path(dir: &Path) -> PathBuf {
    dir.join(format!("{STORAGE_KEY}.json"))
}

fn read_logs(path: &Path) -> Result<Vec<LogEvent>, LogStoreError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
