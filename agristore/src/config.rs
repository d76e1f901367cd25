//! Store configuration
//!
//! Settings come from three layers, applied in order: built-in defaults, an
//! optional JSON file, then `AGRISTORE_*` environment variables.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

const DB_FILENAME: &str = "agristore.db";

pub const ENV_DB_PATH: &str = "AGRISTORE_DB_PATH";
pub const ENV_POOL_SIZE: &str = "AGRISTORE_POOL_SIZE";
pub const ENV_CONNECTION_TIMEOUT: &str = "AGRISTORE_CONNECTION_TIMEOUT_SECS";

/// Configuration for opening a [`crate::db::Database`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Database file; `None` means the platform data directory
    pub database_path: Option<PathBuf>,

    /// Maximum number of pooled connections
    pub pool_size: u32,

    /// How long a caller waits for a free connection
    pub connection_timeout_secs: u64,

    /// SQLite busy timeout applied to every connection
    pub busy_timeout_ms: u64,

    /// Enable write-ahead logging on file databases
    pub wal_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            pool_size: 8,
            connection_timeout_secs: 30,
            busy_timeout_ms: 5000,
            wal_mode: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing keys keep their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// File (when given) followed by environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `AGRISTORE_*` overrides using the given variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_POOL_SIZE) {
            self.pool_size = raw.trim().parse().map_err(|_| {
                StoreError::config(format!("{} is not a valid pool size: {}", ENV_POOL_SIZE, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_CONNECTION_TIMEOUT) {
            self.connection_timeout_secs = raw.trim().parse().map_err(|_| {
                StoreError::config(format!(
                    "{} is not a valid number of seconds: {}",
                    ENV_CONNECTION_TIMEOUT, raw
                ))
            })?;
        }

        self.validate()
    }

    /// Reject settings the pool cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(StoreError::config("pool size must be at least 1"));
        }
        if self.connection_timeout_secs == 0 {
            return Err(StoreError::config("connection timeout must be at least 1 second"));
        }
        Ok(())
    }

    /// The database file this configuration points at
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }
}

fn default_database_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "smartagri", "agristore")
        .ok_or_else(|| StoreError::config("Failed to determine project directories"))?;

    Ok(proj_dirs.data_dir().join(DB_FILENAME))
}
