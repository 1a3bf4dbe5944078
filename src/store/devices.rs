//! Device watchlist.
//!
//! The devices the change report covers when no explicit list is given.

use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeSet;

use super::Store;
use crate::error::{Error, Result};
use crate::snapshot::validate_device_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    pub id: i64,
    pub device: String,
    pub name: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

impl Store {
    /// Add a device to the watchlist, or refresh its name and metadata if already present.
    pub fn add_device(
        &self,
        device: &str,
        name: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        validate_device_id(device)?;
        if name.trim().is_empty() {
            return Err(Error::invalid("device name is empty"));
        }

        let metadata_text = metadata.map(serde_json::to_string).transpose()?;
        let created_at = chrono::Utc::now().timestamp();

        let id: i64 = self.conn.query_row(
            "INSERT INTO devices (device, name, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(device) DO UPDATE SET
                name = excluded.name,
                metadata = excluded.metadata
             RETURNING id",
            params![device, name, metadata_text, created_at],
            |row| row.get(0),
        )?;

        tracing::debug!(device, id, "watchlist entry saved");
        Ok(id)
    }

    pub fn list_devices(&self) -> Result<Vec<DeviceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, device, name, metadata, created_at
             FROM devices
             ORDER BY device",
        )?;

        let entries = stmt
            .query_map([], |row| {
                let metadata_text: Option<String> = row.get(3)?;
                let metadata = metadata_text
                    .map(|text| serde_json::from_str(&text))
                    .transpose()
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                    })?;

                Ok(DeviceEntry {
                    id: row.get(0)?,
                    device: row.get(1)?,
                    name: row.get(2)?,
                    metadata,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn watched_device_ids(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT device FROM devices")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<String>>>()?;
        Ok(ids)
    }

    pub fn remove_device(&self, id: i64) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM devices WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(Error::NotFound(format!("watchlist entry {id}")));
        }
        tracing::info!(id, "watchlist entry removed");
        Ok(())
    }
}
