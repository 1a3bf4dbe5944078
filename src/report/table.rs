//! Terminal table rendering for snapshots and the watchlist.
//!
//! Snapshots are grouped by device in the order given, one row per capture date.

use crate::snapshot::Snapshot;
use crate::store::devices::DeviceEntry;
use std::collections::HashMap;

pub fn render(snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return String::from("No changes detected.\n");
    }

    let mut output = String::new();

    for group in group_by_device(snapshots) {
        let Some(first) = group.first() else { continue };

        output.push_str(&format!("\n{} ({})\n", first.device_id, first.name));
        output.push_str(&"-".repeat(72));
        output.push('\n');

        for snapshot in group {
            let history = snapshot
                .issuance_history
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_else(|| "(none)".to_string());

            output.push_str(&format!(
                "  {:10}  {:16}  {}\n",
                snapshot.captured_on.format("%Y-%m-%d").to_string(),
                truncate(snapshot.country.as_deref().unwrap_or("-"), 16),
                truncate(&history, 40)
            ));
        }
    }

    output
}

/// Devices in first-appearance order, each device's rows in input order.
fn group_by_device(snapshots: &[Snapshot]) -> Vec<Vec<&Snapshot>> {
    let mut groups: Vec<Vec<&Snapshot>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for snapshot in snapshots {
        match index.get(snapshot.device_id.as_str()) {
            Some(&i) => groups[i].push(snapshot),
            None => {
                index.insert(snapshot.device_id.as_str(), groups.len());
                groups.push(vec![snapshot]);
            }
        }
    }

    groups
}

pub fn render_devices(entries: &[DeviceEntry]) -> String {
    if entries.is_empty() {
        return String::from("No devices on the watchlist.\n");
    }

    let mut output = format!("{:<6} {:<20} {:<30} {:<20}\n", "ID", "Device", "Name", "Added");
    output.push_str(&"-".repeat(78));
    output.push('\n');

    for entry in entries {
        let added = chrono::DateTime::from_timestamp(entry.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        output.push_str(&format!(
            "{:<6} {:<20} {:<30} {:<20}\n",
            entry.id,
            truncate(&entry.device, 20),
            truncate(&entry.name, 30),
            added
        ));
    }

    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{IssuanceEntry, IssuanceHistory};
    use chrono::NaiveDate;

    fn snap(id: i64, device: &str, day: u32, volume: Option<&str>) -> Snapshot {
        Snapshot {
            id,
            device_id: device.into(),
            name: format!("{device} plant"),
            address: None,
            country: Some("Chile".into()),
            url: String::new(),
            issuance_history: volume.map(|v| {
                IssuanceHistory::Entries(vec![IssuanceEntry { year: "2020".into(), volume: v.into() }])
            }),
            captured_on: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
        }
    }

    #[test]
    fn empty_input_reports_no_changes() {
        assert_eq!(render(&[]), "No changes detected.\n");
    }

    #[test]
    fn one_header_per_device() {
        let out = render(&[
            snap(1, "B", 12, Some("100")),
            snap(2, "B", 16, None),
            snap(3, "C", 12, Some("100")),
        ]);
        assert_eq!(out.matches("B (B plant)").count(), 1);
        assert_eq!(out.matches("C (C plant)").count(), 1);
        assert!(out.contains("2026-10-12"));
        assert!(out.contains("2020: 100"));
        assert!(out.contains("(none)"));
    }

    #[test]
    fn interleaved_devices_grouped_under_one_header() {
        let out = render(&[
            snap(1, "B", 12, Some("100")),
            snap(2, "C", 12, Some("100")),
            snap(3, "B", 14, Some("150")),
            snap(4, "C", 14, Some("100")),
        ]);
        assert_eq!(out.matches("B (B plant)").count(), 1);
        assert_eq!(out.matches("C (C plant)").count(), 1);

        let b_header = out.find("B (B plant)").unwrap();
        let c_header = out.find("C (C plant)").unwrap();
        let b_second_row = out.find("2026-10-14").unwrap();
        assert!(b_header < b_second_row && b_second_row < c_header);
    }

    #[test]
    fn long_values_truncated() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
