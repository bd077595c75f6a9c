use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::types::{Movement, MovementType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeFilter {
    #[default]
    All,
    Credit,
    Debit,
}

impl TypeFilter {
    fn admits(&self, movement_type: MovementType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Credit => movement_type == MovementType::Credit,
            TypeFilter::Debit => movement_type == MovementType::Debit,
        }
    }
}

/// User-facing search controls over the processed ledger. Every criterion
/// is optional and they combine with AND; blank query values count as
/// unset.
///
/// Date bounds are whole days compared at UTC midnight, both inclusive, so
/// `date_end` admits only movements stamped exactly at midnight on that day.
/// Amount bounds compare magnitudes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub search: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TypeFilter,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_amount: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_amount: Option<f64>,
}

impl MovementFilter {
    pub fn matches(&self, m: &Movement) -> bool {
        if let Some(search) = &self.search {
            if !m.description.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if !self.kind.admits(m.movement_type) {
            return false;
        }
        if let Some(start) = self.date_start {
            if m.date < midnight(start) {
                return false;
            }
        }
        if let Some(end) = self.date_end {
            if m.date > midnight(end) {
                return false;
            }
        }
        let magnitude = m.amount.abs();
        if self.min_amount.is_some_and(|min| magnitude < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| magnitude > max) {
            return false;
        }
        true
    }

    pub fn apply(&self, movements: &[Movement]) -> Vec<Movement> {
        movements.iter().filter(|m| self.matches(m)).cloned().collect()
    }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
