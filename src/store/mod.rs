//! SQLite snapshot storage.
//!
//! Persists ingested snapshots to a local SQLite database with two tables:
//! - snapshots: device, name, address, country, url, issuance_history, captured_on
//! - devices: the watchlist of device ids queried by default
//!
//! Supports:
//! - Upsert keyed on (name, captured_on)
//! - Windowed fetch ordered by device then date (consumed by the change detector)
//! - Watchlist add/list/remove

pub mod devices;
pub mod diff;
pub mod snapshot;

use rusqlite::Connection;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::snapshot::{DateRange, Snapshot};

/// Where the change detector reads snapshots from.
pub trait SnapshotSource {
    /// Every snapshot for `devices` captured inside `range`, ordered by
    /// device id, then capture date, then row id.
    fn fetch(&self, devices: &BTreeSet<String>, range: DateRange) -> Result<Vec<Snapshot>>;
}

/// Default database path (~/.local/share/certwatch/certwatch.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "certwatch")
        .ok_or_else(|| Error::Config("could not determine data directory".into()))?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("certwatch.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device TEXT NOT NULL,
            name TEXT NOT NULL,
            address TEXT,
            country TEXT,
            url TEXT NOT NULL,
            issuance_history TEXT NOT NULL,
            captured_on TEXT NOT NULL,
            UNIQUE(name, captured_on)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_device_date ON snapshots(device, captured_on)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            metadata TEXT,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command; the connection closes on drop.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::StoreUnavailable)?;
        Self::prepare(conn, busy_timeout)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::StoreUnavailable)?;
        Self::prepare(conn, Duration::from_secs(5))
    }

    fn prepare(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.busy_timeout(busy_timeout).map_err(Error::StoreUnavailable)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(Error::StoreUnavailable)?;
        init_schema(&conn).map_err(Error::StoreUnavailable)?;
        tracing::debug!(busy_timeout_ms = busy_timeout.as_millis() as u64, "opened snapshot store");
        Ok(Store { conn })
    }
}
