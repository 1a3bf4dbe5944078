//! Change detection over snapshot history.
//!
//! Reports devices whose issuance history changed inside a trailing window:
//! - Fetches the window's snapshots in one round-trip, ordered by device then date
//! - Compares each device's chronologically adjacent snapshots, stopping at the first difference
//! - Returns every in-window snapshot of each changed device, not just the differing pair

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use super::SnapshotSource;
use crate::error::{Error, Result};
use crate::snapshot::{validate_device_id, DateRange, Snapshot};

pub struct ChangeDetector<'a, S: SnapshotSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: SnapshotSource + ?Sized> ChangeDetector<'a, S> {
    pub fn new(source: &'a S) -> Self {
        ChangeDetector { source }
    }

    /// Snapshots of every device that changed in `[today - days, today]`,
    /// with `today` taken from the local clock.
    pub fn query<I, D>(&self, devices: I, days: u32) -> Result<Vec<Snapshot>>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<str>,
    {
        let today = chrono::Local::now().date_naive();
        self.query_on(devices, days, today)
    }

    /// Same as [`query`](Self::query) against an explicit `today`.
    pub fn query_on<I, D>(&self, devices: I, days: u32, today: NaiveDate) -> Result<Vec<Snapshot>>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<str>,
    {
        if days == 0 {
            return Err(Error::invalid("days must be a positive number"));
        }

        let mut device_set = BTreeSet::new();
        for device in devices {
            let device = device.as_ref();
            validate_device_id(device)?;
            device_set.insert(device.to_string());
        }

        let range = DateRange::trailing(today, days);

        if device_set.is_empty() {
            return Ok(Vec::new());
        }

        let snapshots = self.source.fetch(&device_set, range)?;
        let changed = filter_changed(snapshots);

        if changed.is_empty() {
            tracing::info!(days, devices = device_set.len(), "no issuance history changes in window");
        } else {
            tracing::info!(days, snapshots = changed.len(), "found issuance history changes");
        }

        Ok(changed)
    }
}

/// Keep only the snapshots of devices whose issuance history differs between
/// two adjacent snapshots.
///
/// Input is expected in device-then-date order. Devices keep the order in
/// which they first appear; snapshots keep their order within a device.
pub fn filter_changed(snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    let mut order: Vec<Vec<Snapshot>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for snapshot in snapshots {
        match index.get(&snapshot.device_id) {
            Some(&i) => order[i].push(snapshot),
            None => {
                index.insert(snapshot.device_id.clone(), order.len());
                order.push(vec![snapshot]);
            }
        }
    }

    order
        .into_iter()
        .filter(|group| has_change(group))
        .flatten()
        .collect()
}

fn has_change(group: &[Snapshot]) -> bool {
    let changed = group
        .windows(2)
        .any(|pair| pair[0].issuance_history != pair[1].issuance_history);

    if changed {
        if let Some(first) = group.first() {
            tracing::debug!(device = %first.device_id, snapshots = group.len(), "issuance history changed");
        }
    }

    changed
}
