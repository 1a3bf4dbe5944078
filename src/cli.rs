use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "certwatch")]
#[command(about = "Tracks device certification issuance history and reports changes")]
#[command(version)]
pub struct Cli {
    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "CERTWATCH_DB")]
    pub db: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show devices whose issuance history changed in the last N days
    Changes(ChangesArgs),

    /// Upsert snapshot records from an extraction pipeline JSON file
    Import(ImportArgs),

    /// Show every stored snapshot for specific devices
    History(HistoryArgs),

    /// Show every stored snapshot ordered by capture date
    List(ListArgs),

    /// Manage the device watchlist
    #[command(subcommand)]
    Devices(DevicesCommand),
}

#[derive(Parser)]
pub struct ChangesArgs {
    /// Devices to check (defaults to the watchlist)
    #[arg(long, value_delimiter = ',')]
    pub device: Option<Vec<String>>,

    /// Window size in days (defaults to the configured window)
    #[arg(long)]
    pub days: Option<u32>,

    /// Output as JSON instead of table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// JSON array of pipeline records
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct HistoryArgs {
    /// Devices to show
    #[arg(long, value_delimiter = ',', required = true)]
    pub device: Vec<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum DevicesCommand {
    /// Add a device to the watchlist
    Add(AddDeviceArgs),

    /// List watched devices
    List,

    /// Remove a watchlist entry by its id
    Remove(RemoveDeviceArgs),
}

#[derive(Parser)]
pub struct AddDeviceArgs {
    /// Device identifier as used by the certification registry
    pub device: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Free-form JSON metadata
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Parser)]
pub struct RemoveDeviceArgs {
    /// Watchlist entry id (see `devices list`)
    pub id: i64,
}
