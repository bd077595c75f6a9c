use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{FetchError, TransportError};
use crate::monitor::Monitor;
use crate::types::NewLogEvent;

/// Status and decoded body of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: u16,
    pub body: Value,
}

impl Relayed {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can issue a GET for a bank API path.
///
/// Implementations return `Ok` for any HTTP response, successful or not; an
/// `Err` means no usable response came back at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<Relayed, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, endpoint: &str) -> Result<Relayed, TransportError> {
        (**self).get(endpoint).await
    }
}

/// Wraps a [`Transport`] so every call is timed and recorded.
///
/// Exactly one log event is appended per call, whatever the outcome:
/// non-2xx responses are logged with their status, transport failures
/// with 500. Failures are returned to the caller after logging.
pub struct MonitoredFetch<T> {
    transport: T,
    monitor: Arc<Monitor>,
}

impl<T: Transport> MonitoredFetch<T> {
    pub fn new(transport: T, monitor: Arc<Monitor>) -> Self {
        Self { transport, monitor }
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    pub async fn fetch(&self, endpoint: &str) -> Result<Value, FetchError> {
        let start = Instant::now();
        let outcome = self.transport.get(endpoint).await;
        let latency = elapsed_ms(start);

        let (status, result) = match outcome {
            Ok(relayed) if relayed.is_success() => (relayed.status, Ok(relayed.body)),
            Ok(relayed) => (relayed.status, Err(FetchError::Status { status: relayed.status })),
            Err(e) => {
                let err = FetchError::from(e);
                (err.status(), Err(err))
            }
        };

        let message = match &result {
            Ok(_) => {
                debug!(endpoint, status, latency, "upstream call ok");
                "OK".to_string()
            }
            Err(e) => {
                warn!(endpoint, status, latency, error = %e, "upstream call failed");
                e.to_string()
            }
        };
        self.monitor.append(NewLogEvent::observed(endpoint, status, latency, message));

        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    (start.elapsed().as_secs_f64() * 1000.0).round() as u64
}
