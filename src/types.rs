use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Movements ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Credit,
    Debit,
}

impl MovementType {
    /// Zero counts as a credit.
    pub fn from_amount(amount: f64) -> Self {
        if amount >= 0.0 {
            MovementType::Credit
        } else {
            MovementType::Debit
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementType::Credit => "CREDIT",
            MovementType::Debit => "DEBIT",
        }
    }
}

/// A single upstream record after amount/date coercion, before it has a
/// place on the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMovement {
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub description: String,
    pub movement_type: MovementType,
    /// Upstream fields this crate doesn't interpret, passed through as-is.
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub dynamic_balance: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Analytics output ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskKind {
    HighValue,
    Duplicate,
}

impl RiskKind {
    pub fn label(&self) -> &'static str {
        match self {
            RiskKind::HighValue => "HighValue",
            RiskKind::Duplicate => "Duplicate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    pub risk_kind: RiskKind,
    #[serde(flatten)]
    pub movement: Movement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStats {
    pub total_in: f64,
    pub total_out: f64,
    pub risks: Vec<Risk>,
    pub top5: Vec<Movement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedMovement {
    /// Position of the record in the upstream array.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFinancials {
    pub ledger: Vec<Movement>,
    pub stats: FinancialStats,
    pub rejected: Vec<RejectedMovement>,
}

// ── Monitoring ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    Success,
    Error,
    Risk,
}

/// Calls slower than this are tagged as risky.
pub const RISK_LATENCY_MS: u64 = 2000;

impl LogType {
    /// Error status wins over slow latency.
    pub fn classify(status: u16, latency_ms: u64) -> Self {
        if status >= 400 {
            LogType::Error
        } else if latency_ms > RISK_LATENCY_MS {
            LogType::Risk
        } else {
            LogType::Success
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LogType::Success => "SUCCESS",
            LogType::Error => "ERROR",
            LogType::Risk => "RISK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub status: u16,
    pub latency: u64,
    #[serde(rename = "type")]
    pub log_type: LogType,
    pub message: String,
}

/// Everything a caller supplies when recording an observation; the store
/// fills in `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEvent {
    pub endpoint: String,
    pub status: u16,
    pub latency: u64,
    pub log_type: LogType,
    pub message: String,
}

impl NewLogEvent {
    pub fn observed(endpoint: impl Into<String>, status: u16, latency: u64, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            status,
            latency,
            log_type: LogType::classify(status, latency),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    Ok,
    Degraded,
    Critical,
}

impl SystemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SystemStatus::Ok => "OK",
            SystemStatus::Degraded => "DEGRADED",
            SystemStatus::Critical => "CRITICAL",
        }
    }
}
