//! Environment-driven settings for the index service.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "WORLDSTORE_DATA_DIR";
pub const DEBOUNCE_MS_ENV: &str = "WORLDSTORE_DEBOUNCE_MS";
pub const WATCH_ENV: &str = "WORLDSTORE_WATCH";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Root of the document store.
    pub data_dir: PathBuf,
    /// Quiet window before a watcher-triggered rebuild.
    pub debounce: Duration,
    pub watch: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            watch: true,
        }
    }
}

impl IndexConfig {
    /// Reads the process environment. Unset or unparsable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let debounce_ms = lookup(DEBOUNCE_MS_ENV)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        let watch = lookup(WATCH_ENV)
            .and_then(|value| parse_flag(&value))
            .unwrap_or(true);

        Self {
            data_dir,
            debounce: Duration::from_millis(debounce_ms),
            watch,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
