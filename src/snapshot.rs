//! Snapshot records and the date window they are queried by.
//!
//! A snapshot is one device's extracted certification facts on one capture
//! date. Records without a row id (`SnapshotRecord`) are what the ingest
//! pipeline produces; stored rows (`Snapshot`) carry the id the store
//! assigned, which breaks ordering ties between rows sharing a date.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// One `{year, volume}` line of a device's issuance history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuanceEntry {
    pub year: String,
    pub volume: String,
}

/// Extracted issuance history.
///
/// Values shaped like a list of year/volume entries parse into `Entries`;
/// anything else the extractor returned is kept verbatim in `Raw` so that
/// equality stays structural over the whole value. Numbers in raw values
/// compare by value, so `100` and `100.0` are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssuanceHistory {
    Entries(Vec<IssuanceEntry>),
    Raw(serde_json::Value),
}

impl IssuanceHistory {
    /// Parse a stored JSON column. `null` maps to `None`.
    pub fn from_json_text(text: &str) -> serde_json::Result<Option<Self>> {
        serde_json::from_str(text)
    }

    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl PartialEq for IssuanceHistory {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IssuanceHistory::Entries(a), IssuanceHistory::Entries(b)) => a == b,
            (IssuanceHistory::Raw(a), IssuanceHistory::Raw(b)) => values_equal(a, b),
            _ => false,
        }
    }
}

fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, x)| y.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

impl fmt::Display for IssuanceHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuanceHistory::Entries(entries) if entries.is_empty() => write!(f, "(empty)"),
            IssuanceHistory::Entries(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{}: {}", e.year, e.volume))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            IssuanceHistory::Raw(value) => write!(f, "{value}"),
        }
    }
}

/// A snapshot as produced by ingestion, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub device_id: String,
    pub name: String,
    pub address: Option<String>,
    pub country: Option<String>,
    pub url: String,
    pub issuance_history: Option<IssuanceHistory>,
    pub captured_on: NaiveDate,
}

/// A stored snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub device_id: String,
    pub name: String,
    pub address: Option<String>,
    pub country: Option<String>,
    pub url: String,
    pub issuance_history: Option<IssuanceHistory>,
    pub captured_on: NaiveDate,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `[today - days, today]`, both ends included. Windows reaching past the
    /// earliest representable date start there.
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        DateRange { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Reject ids that are empty or carry whitespace or control characters.
pub fn validate_device_id(device: &str) -> Result<()> {
    if device.is_empty() {
        return Err(Error::invalid("device id is empty"));
    }
    if device.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::invalid(format!("device id {device:?} contains whitespace or control characters")));
    }
    Ok(())
}
