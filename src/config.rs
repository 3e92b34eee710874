//! Dashboard configuration.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! ```toml
//! login_path = "/login"
//!
//! [storage]
//! backend = "file"          # or "memory"
//! dir = "/var/lib/fitdash"
//! quota_bytes = 5242880     # memory backend only
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `FITDASH_LOGIN_PATH` | `login_path` |
//! | `FITDASH_STORAGE_BACKEND` | `storage.backend` |
//! | `FITDASH_STORAGE_DIR` | `storage.dir` |
//! | `FITDASH_STORAGE_QUOTA` | `storage.quota_bytes` |

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guard::DEFAULT_LOGIN_PATH;
use crate::storage::{FileStorage, InMemoryStorage, Storage, StorageError};

pub const ENV_LOGIN_PATH: &str = "FITDASH_LOGIN_PATH";
pub const ENV_STORAGE_BACKEND: &str = "FITDASH_STORAGE_BACKEND";
pub const ENV_STORAGE_DIR: &str = "FITDASH_STORAGE_DIR";
pub const ENV_STORAGE_QUOTA: &str = "FITDASH_STORAGE_QUOTA";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to open storage: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend `{}`, expected `memory` or `file`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory of the file backend. Required when `backend = "file"`.
    pub dir: Option<PathBuf>,
    /// Byte quota of the memory backend.
    pub quota_bytes: Option<usize>,
}

impl StorageConfig {
    /// Build the configured backend.
    ///
    /// Every call opens a separate area handle. Storage events only flow
    /// between contexts derived from one handle, so share the returned `Arc`
    /// rather than calling `open` again for the same directory.
    pub fn open(&self) -> Result<Arc<dyn Storage>, ConfigError> {
        match self.backend {
            StorageBackend::Memory => {
                let storage = match self.quota_bytes {
                    Some(quota) => InMemoryStorage::with_quota(quota),
                    None => InMemoryStorage::new(),
                };
                Ok(Arc::new(storage))
            }
            StorageBackend::File => {
                let dir = self.dir.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("storage.dir is required for the file backend".into())
                })?;
                if self.quota_bytes.is_some() {
                    tracing::warn!("storage.quota_bytes is ignored by the file backend");
                }
                Ok(Arc::new(FileStorage::open(dir)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Where unauthenticated visitors are sent.
    pub login_path: String,
    pub storage: StorageConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            storage: StorageConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        tracing::debug!(
            login_path = %config.login_path,
            backend = ?config.storage.backend,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_LOGIN_PATH) {
            self.login_path = path;
        }
        if let Some(backend) = lookup(ENV_STORAGE_BACKEND) {
            self.storage.backend = backend.parse()?;
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR) {
            self.storage.dir = Some(PathBuf::from(dir));
        }
        if let Some(quota) = lookup(ENV_STORAGE_QUOTA) {
            let quota = quota.trim().parse::<usize>().map_err(|err| {
                ConfigError::Invalid(format!("{} must be a byte count: {}", ENV_STORAGE_QUOTA, err))
            })?;
            self.storage.quota_bytes = Some(quota);
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "login_path must be an absolute path, got `{}`",
                self.login_path
            )));
        }
        Ok(())
    }
}
