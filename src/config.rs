use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::store;

const SECS_PER_DAY: u64 = 86_400;

pub struct Config {
    pub db_path: PathBuf,
    pub window_days: u32,
    pub busy_timeout: Duration,
    pub verbose: bool,
}

/// Contents of config.toml. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database: Option<PathBuf>,
    window: Option<String>,
    busy_timeout: Option<String>,
}

impl Config {
    /// Layer command line flags over the config file over built-in defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => read_file_config(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file_config(&path)?,
                _ => FileConfig::default(),
            },
        };

        let window_days = match &file.window {
            Some(text) => parse_window_days(text)?,
            None => 7,
        };

        let busy_timeout = match &file.busy_timeout {
            Some(text) => humantime::parse_duration(text)
                .map_err(|e| Error::Config(format!("busy_timeout {text:?}: {e}")))?,
            None => Duration::from_secs(5),
        };

        let db_path = match cli.db.clone().or(file.database) {
            Some(path) => path,
            None => store::default_db_path()?,
        };

        Ok(Config {
            db_path,
            window_days,
            busy_timeout,
            verbose: cli.verbose,
        })
    }
}

/// ~/.config/certwatch/config.toml or platform equivalent
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "certwatch").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

/// Window durations must be a positive whole number of days ("7d", "2 days", "1w").
pub fn parse_window_days(text: &str) -> Result<u32> {
    let duration = humantime::parse_duration(text)
        .map_err(|e| Error::Config(format!("window {text:?}: {e}")))?;
    let secs = duration.as_secs();
    if secs == 0 || secs % SECS_PER_DAY != 0 || duration.subsec_nanos() != 0 {
        return Err(Error::Config(format!("window {text:?} is not a whole number of days")));
    }
    u32::try_from(secs / SECS_PER_DAY).map_err(|_| Error::Config(format!("window {text:?} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn window_accepts_day_and_week_units() {
        assert_eq!(parse_window_days("7d").unwrap(), 7);
        assert_eq!(parse_window_days("2days").unwrap(), 2);
        assert_eq!(parse_window_days("1w").unwrap(), 7);
    }

    #[test]
    fn window_rejects_partial_days() {
        assert!(parse_window_days("36h").is_err());
        assert!(parse_window_days("0d").is_err());
        assert!(parse_window_days("soon").is_err());
    }

    #[test]
    fn cli_db_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database = \"/from/file.db\"\nwindow = \"2d\"\nbusy_timeout = \"250ms\"").unwrap();

        let cli = Cli::parse_from([
            "certwatch",
            "--config",
            config_path.to_str().unwrap(),
            "--db",
            "/from/flag.db",
            "list",
        ]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/from/flag.db"));
        assert_eq!(config.window_days, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "windw = \"7d\"\n").unwrap();

        let cli = Cli::parse_from(["certwatch", "--config", config_path.to_str().unwrap(), "--db", "x.db", "list"]);
        assert!(matches!(Config::load(&cli), Err(Error::Config(_))));
    }
}
