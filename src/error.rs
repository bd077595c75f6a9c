use thiserror::Error;

/// Why a single upstream movement record could not be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MovementError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("missing amount")]
    MissingAmount,
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("missing date")]
    MissingDate,
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Failure to obtain a JSON body from the bank (or from a proxy in front of it).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FetchError {
    /// Status recorded in the monitoring log for this failure.
    pub fn status(&self) -> u16 {
        match self {
            FetchError::Status { status } => *status,
            FetchError::Transport(_) => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("log store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("log store encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required for this mode")]
    Missing(&'static str),
    #[error("invalid base URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("anomaly rate must be a number between 0 and 1, got {0}")]
    InvalidAnomalyRate(f64),
}
