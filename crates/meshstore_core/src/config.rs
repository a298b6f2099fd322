//! Store configuration.
//!
//! # Responsibility
//! - Describe where the store lives and how it is tuned.
//! - Load overrides from a JSON file; every field has a default.
//!
//! # Invariants
//! - `pool_size` and `batch_size` are never zero once resolved.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORE_FILE: &str = "store.db";
pub const DEFAULT_BATCH_SIZE: usize = 500;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Settings for opening a `SqliteStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file.
    pub data_dir: PathBuf,
    pub file_name: String,
    /// Pooled connections. `None` sizes the pool to available parallelism.
    pub pool_size: Option<usize>,
    pub busy_timeout_ms: u64,
    /// Rows per multi-row insert statement.
    pub batch_size: usize,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            file_name: DEFAULT_STORE_FILE.to_string(),
            pool_size: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            log_level: crate::logging::default_log_level().to_string(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    pub fn resolved_pool_size(&self) -> usize {
        match self.pool_size {
            Some(size) if size > 0 => size,
            _ => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }

    pub fn resolved_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, DEFAULT_BATCH_SIZE, DEFAULT_STORE_FILE};
    use std::time::Duration;

    #[test]
    fn defaults_match_store_contract() {
        let config = StoreConfig::default();
        assert_eq!(config.file_name, DEFAULT_STORE_FILE);
        assert_eq!(config.resolved_batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.resolved_pool_size() >= 1);
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let config = StoreConfig {
            pool_size: Some(0),
            batch_size: 0,
            ..StoreConfig::default()
        };
        assert!(config.resolved_pool_size() >= 1);
        assert_eq!(config.resolved_batch_size(), 1);
    }

    #[test]
    fn json_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{ "data_dir": "/var/lib/mesh", "pool_size": 3 }"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.pool_size, Some(3));
        assert_eq!(config.resolved_pool_size(), 3);
        assert_eq!(
            config.store_path(),
            std::path::Path::new("/var/lib/mesh").join(DEFAULT_STORE_FILE)
        );
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StoreConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
