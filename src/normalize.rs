//! Movement extraction and coercion.
//!
//! The bank's response envelope isn't fixed, so the movement array is looked
//! up in a few well-known places before giving up. Each record is then
//! coerced on its own; a bad record never fails the whole payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::MovementError;
use crate::types::{MovementType, NormalizedMovement, RejectedMovement};

/// Envelope keys probed, in order, when the payload isn't a bare array.
const ENVELOPE_KEYS: &[&str] = &["data", "results", "movements"];

/// Fields with a dedicated slot on [`NormalizedMovement`]; everything else
/// lands in `extra`. Derived fields from an earlier pass are dropped.
const KNOWN_FIELDS: &[&str] = &["id", "date", "amount", "description", "type", "dynamicBalance"];

/// What to do with a record whose amount can't be read as a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InvalidAmountPolicy {
    /// Leave the record out and report it as rejected.
    #[default]
    Drop,
    /// Keep the record with an amount of zero.
    Zero,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub movements: Vec<NormalizedMovement>,
    pub rejected: Vec<RejectedMovement>,
}

/// Locate the raw movement array. `None` means the payload has no shape we
/// recognise.
pub fn extract_records(payload: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(items) = payload {
        return Some(items);
    }
    ENVELOPE_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
}

pub fn normalize(payload: &Value, policy: InvalidAmountPolicy) -> Option<Normalized> {
    let records = extract_records(payload)?;
    let mut out = Normalized {
        movements: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };

    for (index, raw) in records.iter().enumerate() {
        match normalize_record(index, raw, policy) {
            Ok(movement) => out.movements.push(movement),
            Err(e) => out.rejected.push(RejectedMovement { index, reason: e.to_string() }),
        }
    }
    Some(out)
}

pub fn normalize_record(
    index: usize,
    raw: &Value,
    policy: InvalidAmountPolicy,
) -> Result<NormalizedMovement, MovementError> {
    let obj = raw.as_object().ok_or(MovementError::NotAnObject)?;

    let amount = match (parse_amount(obj.get("amount")), policy) {
        (Ok(amount), _) => amount,
        (Err(_), InvalidAmountPolicy::Zero) => 0.0,
        (Err(e), InvalidAmountPolicy::Drop) => return Err(e),
    };
    let date = parse_date(obj.get("date"))?;

    let id = match obj.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => index.to_string(),
    };
    let description = match obj.get("description") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    let extra: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(NormalizedMovement {
        id,
        date,
        amount,
        description,
        movement_type: MovementType::from_amount(amount),
        extra,
    })
}

/// Accepts JSON numbers and numeric strings. Non-finite values are rejected
/// so that sums over the ledger stay meaningful.
pub fn parse_amount(value: Option<&Value>) -> Result<f64, MovementError> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(MovementError::MissingAmount),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(amount) if amount.is_finite() => Ok(amount),
        _ => Err(MovementError::InvalidAmount(value.map(Value::to_string).unwrap_or_default())),
    }
}

/// RFC 3339, naive date-times (read as UTC), bare dates (UTC midnight), or
/// epoch milliseconds.
pub fn parse_date(value: Option<&Value>) -> Result<DateTime<Utc>, MovementError> {
    match value {
        None | Some(Value::Null) => Err(MovementError::MissingDate),
        Some(Value::String(s)) => {
            parse_date_str(s.trim()).ok_or_else(|| MovementError::InvalidDate(s.clone()))
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| MovementError::InvalidDate(n.to_string())),
        Some(other) => Err(MovementError::InvalidDate(other.to_string())),
    }
}

pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
