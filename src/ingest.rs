//! Import of extraction pipeline output.
//!
//! The scraping and extraction pipeline emits a JSON array of records shaped
//! `{device, name, address, country, issuance_history, url, date}`. Records
//! are validated and normalized up front, then written in one transaction so
//! a bad file leaves the store untouched.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::snapshot::{validate_device_id, IssuanceHistory, SnapshotRecord};
use crate::store::Store;

#[derive(Debug, Deserialize)]
struct PipelineRecord {
    #[serde(alias = "devices")]
    device: String,
    name: Option<String>,
    address: Option<String>,
    country: Option<String>,
    #[serde(default)]
    issuance_history: serde_json::Value,
    url: Option<String>,
    #[serde(alias = "today")]
    date: String,
}

/// Capture dates arrive as `%m/%d/%Y`; ISO dates are accepted too.
pub fn parse_capture_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| Error::invalid(format!("unrecognized capture date {text:?}")))
}

/// Lists are kept, null stays null, any other value becomes a one-element list.
pub fn normalize_history(value: serde_json::Value) -> Result<Option<IssuanceHistory>> {
    let value = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Array(_) => value,
        other => serde_json::Value::Array(vec![other]),
    };
    Ok(Some(serde_json::from_value(value)?))
}

fn required(field: &str, value: Option<String>, index: usize) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::invalid(format!("record {index}: missing {field}"))),
    }
}

fn convert(index: usize, raw: PipelineRecord) -> Result<SnapshotRecord> {
    validate_device_id(&raw.device)
        .map_err(|e| Error::invalid(format!("record {index}: {e}")))?;
    let captured_on = parse_capture_date(&raw.date)
        .map_err(|e| Error::invalid(format!("record {index}: {e}")))?;

    Ok(SnapshotRecord {
        device_id: raw.device,
        name: required("name", raw.name, index)?,
        address: raw.address,
        country: raw.country,
        url: required("url", raw.url, index)?,
        issuance_history: normalize_history(raw.issuance_history)?,
        captured_on,
    })
}

pub fn parse_records(text: &str) -> Result<Vec<SnapshotRecord>> {
    let raw: Vec<PipelineRecord> = serde_json::from_str(text)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, record)| convert(index, record))
        .collect()
}

/// Parse `path` and upsert every record. Returns the number of rows written.
pub fn import_file(store: &mut Store, path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let records = parse_records(&text)?;
    let written = store.upsert_snapshots(&records)?;
    tracing::info!(path = %path.display(), records = written, "imported snapshots");
    Ok(written)
}
