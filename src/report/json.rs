//! JSON output for snapshot lists.
//!
//! Serializes snapshots to a JSON array for scripting and piping.

use crate::snapshot::Snapshot;

pub fn render(snapshots: &[Snapshot]) -> String {
    serde_json::to_string_pretty(snapshots).unwrap_or_else(|_| String::from("[]"))
}
