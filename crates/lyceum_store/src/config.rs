//! Connection and logging configuration.
//!
//! # Responsibility
//! - Describe how to reach the document store and where to log.
//! - Load settings from a TOML file, defaulting every omitted field.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "lyceum";
pub const MEMORY_URL: &str = ":memory:";

/// Settings consumed by [`crate::db::connect`] and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectOptions {
    /// SQLite file path, or `:memory:` for a throwaway store.
    pub db_url: String,

    /// Database provisioned on connect.
    pub database: String,

    /// How long a call may wait on a locked store before failing with
    /// `StoreError::Timeout`.
    pub busy_timeout_ms: u64,

    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            db_url: "lyceum.sqlite3".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            busy_timeout_ms: 5_000,
            log_level: None,
            log_dir: None,
        }
    }
}

impl ConnectOptions {
    pub fn in_memory() -> Self {
        Self {
            db_url: MEMORY_URL.to_string(),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            StoreError::Config(format!(
                "failed to read config file `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> StoreResult<Self> {
        toml::from_str(contents).map_err(|err| StoreError::Config(err.to_string()))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn is_memory(&self) -> bool {
        self.db_url == MEMORY_URL
    }
}
