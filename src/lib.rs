pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod report;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
pub use snapshot::{DateRange, IssuanceEntry, IssuanceHistory, Snapshot, SnapshotRecord};
pub use store::diff::ChangeDetector;
pub use store::{SnapshotSource, Store};
