//! A synthetic bank API for demos, tests and benchmarks.
//!
//! Serves the two endpoints the dashboard consumes, filled with generated
//! movements. A fraction of cycles inject an oversized movement or an
//! immediate repeat of the previous one, so the risk panel has something
//! to show. Amounts are emitted as strings part of the time and the
//! response envelope varies, the way real upstreams do.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use tracing::info;

use crate::upstream::API_KEY_HEADER;

const DEBITS: &[(&str, f64, f64)] = &[
    ("Supermarket", 15.0, 180.0),
    ("Fuel station", 30.0, 90.0),
    ("Electricity bill", 40.0, 120.0),
    ("Restaurant", 12.0, 75.0),
    ("Online store", 8.0, 250.0),
    ("Pharmacy", 5.0, 60.0),
];

const CREDITS: &[(&str, f64, f64)] = &[
    ("Salary", 1800.0, 3200.0),
    ("Transfer received", 20.0, 400.0),
    ("Refund", 5.0, 80.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Bare,
    Data,
    Results,
    Movements,
}

pub const ALL_ENVELOPES: &[Envelope] = &[Envelope::Bare, Envelope::Data, Envelope::Results, Envelope::Movements];

impl Envelope {
    pub fn wrap(&self, records: Vec<Value>) -> Value {
        match self {
            Envelope::Bare => Value::Array(records),
            Envelope::Data => json!({ "data": records }),
            Envelope::Results => json!({ "results": records }),
            Envelope::Movements => json!({ "movements": records }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Anomaly {
    HighValue,
    Duplicate,
}

pub struct MovementGenerator {
    rng: StdRng,
    seq: u64,
    pub anomaly_rate: f64,
    pub start: NaiveDate,
}

impl MovementGenerator {
    pub fn new(anomaly_rate: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), anomaly_rate)
    }

    /// Same seed, same movements.
    pub fn seeded(seed: u64, anomaly_rate: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), anomaly_rate)
    }

    fn with_rng(rng: StdRng, anomaly_rate: f64) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        Self { rng, seq: 0, anomaly_rate, start }
    }

    /// Raw upstream records, oldest first, a few per day.
    pub fn generate(&mut self, count: usize) -> Vec<Value> {
        let mut records: Vec<Value> = Vec::with_capacity(count);
        let mut day = self.start;
        let anomaly_rate = if self.anomaly_rate.is_finite() { self.anomaly_rate.clamp(0.0, 1.0) } else { 0.0 };

        while records.len() < count {
            if self.rng.gen_bool(0.4) {
                day += Duration::days(1);
            }

            let anomaly = if self.rng.gen_bool(anomaly_rate) {
                Some(if self.rng.gen_bool(0.5) { Anomaly::HighValue } else { Anomaly::Duplicate })
            } else {
                None
            };

            let record = match (anomaly, records.last()) {
                (Some(Anomaly::Duplicate), Some(prev)) => self.repeat(prev),
                (Some(Anomaly::HighValue), _) => {
                    let (description, amount) = self.pick_amount();
                    let factor = self.rng.gen_range(10.0..30.0);
                    self.record(day, &description, amount * factor)
                }
                _ => {
                    let (description, amount) = self.pick_amount();
                    self.record(day, &description, amount)
                }
            };
            records.push(record);
        }
        records
    }

    fn pick_amount(&mut self) -> (String, f64) {
        let (table, sign) = if self.rng.gen_bool(0.2) { (CREDITS, 1.0) } else { (DEBITS, -1.0) };
        let (description, low, high) = table[self.rng.gen_range(0..table.len())];
        (description.to_string(), sign * self.rng.gen_range(low..high))
    }

    fn record(&mut self, day: NaiveDate, description: &str, amount: f64) -> Value {
        self.seq += 1;
        let amount = (amount * 100.0).round() / 100.0;
        let amount_value = if self.rng.gen_bool(0.5) { json!(format!("{amount:.2}")) } else { json!(amount) };
        json!({
            "id": format!("MOV-{:06}", self.seq),
            "date": day.format("%Y-%m-%d").to_string(),
            "amount": amount_value,
            "description": description,
        })
    }

    fn repeat(&mut self, prev: &Value) -> Value {
        self.seq += 1;
        let mut copy = prev.clone();
        copy["id"] = json!(format!("MOV-{:06}", self.seq));
        copy
    }

    pub fn random_envelope(&mut self) -> Envelope {
        ALL_ENVELOPES[self.rng.gen_range(0..ALL_ENVELOPES.len())]
    }
}

/// In-memory state behind the sandbox endpoints.
#[derive(Debug, Clone)]
pub struct SandboxBank {
    pub account_id: String,
    pub api_key: String,
    pub balance: f64,
    pub movements: Value,
}

impl SandboxBank {
    pub fn generate(account_id: impl Into<String>, api_key: impl Into<String>, count: usize, anomaly_rate: f64) -> Self {
        let mut generator = MovementGenerator::new(anomaly_rate);
        let records = generator.generate(count);
        let envelope = generator.random_envelope();
        Self::from_records(account_id, api_key, records, envelope)
    }

    pub fn from_records(account_id: impl Into<String>, api_key: impl Into<String>, records: Vec<Value>, envelope: Envelope) -> Self {
        let balance = records
            .iter()
            .filter_map(|r| crate::normalize::parse_amount(r.get("amount")).ok())
            .sum::<f64>();
        Self {
            account_id: account_id.into(),
            api_key: api_key.into(),
            balance: (balance * 100.0).round() / 100.0,
            movements: envelope.wrap(records),
        }
    }

    fn authorize(&self, headers: &HeaderMap, account_id: &str) -> Result<(), Response> {
        if !self.api_key.is_empty() {
            let presented = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
            if presented != Some(self.api_key.as_str()) {
                return Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response());
            }
        }
        if account_id != self.account_id {
            return Err((StatusCode::NOT_FOUND, Json(json!({ "error": "Account not found" }))).into_response());
        }
        Ok(())
    }
}

pub fn router(bank: SandboxBank) -> Router {
    Router::new()
        .route("/api/accounts/:id/balance", get(balance_handler))
        .route("/api/accounts/:id/movements", get(movements_handler))
        .with_state(Arc::new(bank))
}

async fn balance_handler(
    State(bank): State<Arc<SandboxBank>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers, &id) {
        return rejection;
    }
    Json(json!({ "balance": bank.balance })).into_response()
}

async fn movements_handler(
    State(bank): State<Arc<SandboxBank>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = bank.authorize(&headers, &id) {
        return rejection;
    }
    Json(bank.movements.clone()).into_response()
}

pub async fn run(port: u16, bank: SandboxBank) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{port}");
    info!(%addr, account = %bank.account_id, "sandbox bank listening");
    println!("Sandbox bank at http://localhost:{port} (account {})", bank.account_id);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(bank)).await?;
    Ok(())
}
