use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;

use super::{SnapshotSource, Store};
use crate::error::{Error, Result};
use crate::snapshot::{DateRange, IssuanceHistory, Snapshot, SnapshotRecord};

const SNAPSHOT_COLUMNS: &str =
    "id, device, name, address, country, url, issuance_history, captured_on";

const UPSERT_SQL: &str = "INSERT INTO snapshots (device, name, address, country, url, issuance_history, captured_on)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(name, captured_on) DO UPDATE SET
        device = excluded.device,
        address = excluded.address,
        country = excluded.country,
        url = excluded.url,
        issuance_history = excluded.issuance_history";

impl Store {
    /// Insert a snapshot, or overwrite the row already holding its (name, captured_on).
    pub fn upsert_snapshot(&mut self, record: &SnapshotRecord) -> Result<()> {
        self.upsert_snapshots(std::slice::from_ref(record)).map(|_| ())
    }

    /// Upsert a batch in one transaction. Returns the number of rows written.
    pub fn upsert_snapshots(&mut self, records: &[SnapshotRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
        for record in records {
            let history = history_to_column(record.issuance_history.as_ref())?;
            stmt.execute(params![
                record.device_id,
                record.name,
                record.address,
                record.country,
                record.url,
                history,
                record.captured_on,
            ])?;
        }

        drop(stmt);
        tx.commit()?;

        tracing::debug!(rows = records.len(), "upserted snapshots");
        Ok(records.len())
    }

    /// Every snapshot for the given devices regardless of date.
    pub fn history(&self, devices: &BTreeSet<String>) -> Result<Vec<Snapshot>> {
        if devices.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS}
             FROM snapshots
             WHERE device IN ({})
             ORDER BY device, captured_on, id",
            placeholders(devices.len())
        );

        let snapshots = query_snapshots(&self.conn, &sql, params_from_iter(devices.iter()))?;
        if snapshots.is_empty() {
            tracing::info!(devices = devices.len(), "no snapshots found for the given devices");
        }
        Ok(snapshots)
    }

    /// Every snapshot in the store ordered by capture date.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS}
             FROM snapshots
             ORDER BY captured_on, id"
        );
        Ok(query_snapshots(&self.conn, &sql, [])?)
    }
}

impl SnapshotSource for Store {
    fn fetch(&self, devices: &BTreeSet<String>, range: DateRange) -> Result<Vec<Snapshot>> {
        if devices.is_empty() {
            return Ok(Vec::new());
        }

        // ?1 and ?2 bound the window, device ids follow
        let device_params: Vec<String> = (0..devices.len()).map(|i| format!("?{}", i + 3)).collect();
        let sql = format!(
            "SELECT {SNAPSHOT_COLUMNS}
             FROM snapshots
             WHERE captured_on >= ?1 AND captured_on <= ?2
               AND device IN ({})
             ORDER BY device, captured_on, id",
            device_params.join(", ")
        );

        let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(devices.len() + 2);
        values.push(range.start.format("%F").to_string().into());
        values.push(range.end.format("%F").to_string().into());
        values.extend(devices.iter().map(|d| rusqlite::types::Value::from(d.clone())));

        let snapshots = query_snapshots(&self.conn, &sql, params_from_iter(values))
            .map_err(fetch_error)?;

        tracing::debug!(
            devices = devices.len(),
            start = %range.start,
            end = %range.end,
            rows = snapshots.len(),
            "fetched snapshots in window"
        );

        Ok(snapshots)
    }
}

/// Rows that fail to decode are bad data, not an unreachable store.
fn fetch_error(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => Error::Store(err),
        other => Error::StoreUnavailable(other),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn query_snapshots<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<Snapshot>> {
    let mut stmt = conn.prepare(sql)?;
    let snapshots = stmt.query_map(params, snapshot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(snapshots)
}

fn history_to_column(history: Option<&IssuanceHistory>) -> Result<String> {
    Ok(match history {
        Some(h) => h.to_json_text()?,
        None => "null".to_string(),
    })
}

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    let history_text: String = row.get(6)?;
    let issuance_history = IssuanceHistory::from_json_text(&history_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Snapshot {
        id: row.get(0)?,
        device_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        country: row.get(4)?,
        url: row.get(5)?,
        issuance_history,
        captured_on: row.get(7)?,
    })
}
