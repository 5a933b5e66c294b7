//! Disk cache configuration with precedence and validation
//!
//! Precedence, lowest first: built-in defaults, an optional JSON file,
//! then `STASHD_DISK_*` environment variables.

use crate::cleanup::DEFAULT_MAX_CONCURRENT_REMOVALS;
use crate::errors::{CacheError, RecoveryHint, Result};
use serde::{Deserialize, Serialize};
use stashd_utils::xdg::XdgPaths;
use std::path::{Path, PathBuf};

/// Default size budget: 10GiB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Lower bound on scanner threads
pub const MIN_SCAN_WORKERS: usize = 4;

/// Upper bound on scanner threads
pub const MAX_SCAN_WORKERS: usize = 16;

pub const ENV_DIR: &str = "STASHD_DISK_DIR";
pub const ENV_MAX_SIZE: &str = "STASHD_DISK_MAX_SIZE";
pub const ENV_MAX_REMOVALS: &str = "STASHD_DISK_MAX_REMOVALS";

/// Configuration for a disk cache instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiskCacheConfig {
    /// Root directory of the cache
    pub base_dir: PathBuf,
    /// Budget for the sum of on-disk sizes of all indexed entries
    pub max_size_bytes: u64,
    /// Cap on concurrent background file removals. Defaults to 5000, or
    /// 3000 on macOS where many concurrent removals fail to get threads.
    pub max_concurrent_removals: usize,
    /// Threads used to migrate legacy layouts; hardware parallelism if unset
    pub migration_workers: Option<usize>,
    /// Threads used to scan shards; hardware parallelism clamped to
    /// `[4, 16]` if unset
    pub scan_workers: Option<usize>,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            base_dir: XdgPaths::disk_store_dir(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_concurrent_removals: DEFAULT_MAX_CONCURRENT_REMOVALS,
            migration_workers: None,
            scan_workers: None,
        }
    }
}

impl DiskCacheConfig {
    /// Configuration rooted at `base_dir` with a `max_size_bytes` budget
    pub fn new(base_dir: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_size_bytes,
            ..Self::default()
        }
    }

    pub fn builder() -> DiskCacheConfigBuilder {
        DiskCacheConfigBuilder::new()
    }

    /// Threads for the migration pool
    pub fn effective_migration_workers(&self) -> usize {
        self.migration_workers
            .unwrap_or_else(stashd_utils::available_workers)
            .max(1)
    }

    /// Threads for the scanner pool
    pub fn effective_scan_workers(&self) -> usize {
        self.scan_workers
            .unwrap_or_else(|| stashd_utils::clamped_workers(MIN_SCAN_WORKERS, MAX_SCAN_WORKERS))
            .max(1)
    }

    /// Reject values the cache cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(CacheError::configuration("base directory must not be empty"));
        }
        if self.max_size_bytes == 0 {
            return Err(CacheError::configuration("maximum size must be greater than zero"));
        }
        if self.max_concurrent_removals == 0 {
            return Err(CacheError::configuration(
                "concurrent removal limit must be greater than zero",
            ));
        }
        if self.migration_workers == Some(0) || self.scan_workers == Some(0) {
            return Err(CacheError::configuration("worker counts must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for creating disk cache configurations
#[derive(Debug, Default)]
pub struct DiskCacheConfigBuilder {
    config: DiskCacheConfig,
}

impl DiskCacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = base_dir.into();
        self
    }

    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.config.max_size_bytes = max_size_bytes;
        self
    }

    pub fn with_max_concurrent_removals(mut self, limit: usize) -> Self {
        self.config.max_concurrent_removals = limit;
        self
    }

    pub fn with_migration_workers(mut self, workers: usize) -> Self {
        self.config.migration_workers = Some(workers);
        self
    }

    pub fn with_scan_workers(mut self, workers: usize) -> Self {
        self.config.scan_workers = Some(workers);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<DiskCacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration loader that handles precedence
pub struct DiskCacheConfigLoader;

impl DiskCacheConfigLoader {
    /// Load defaults, then `path` if it exists, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<DiskCacheConfig> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?.unwrap_or_default(),
            None => DiskCacheConfig::default(),
        };
        Self::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Default location of the configuration file
    pub fn default_config_path() -> PathBuf {
        XdgPaths::config_dir().join("disk.json")
    }

    fn load_from_file(path: &Path) -> Result<Option<DiskCacheConfig>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    operation: "read config file",
                    source: e,
                    recovery_hint: RecoveryHint::CheckPermissions {
                        path: path.to_path_buf(),
                    },
                })
            }
        };

        let config = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded disk cache configuration file");
        Ok(Some(config))
    }

    fn apply_env(config: &mut DiskCacheConfig) -> Result<()> {
        if let Some(dir) = env_var(ENV_DIR) {
            config.base_dir = PathBuf::from(dir);
        }
        if let Some(size) = env_var(ENV_MAX_SIZE) {
            config.max_size_bytes = parse_env(ENV_MAX_SIZE, &size)?;
        }
        if let Some(limit) = env_var(ENV_MAX_REMOVALS) {
            config.max_concurrent_removals = parse_env(ENV_MAX_REMOVALS, &limit)?;
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CacheError::configuration(format!("{name} must be a non-negative integer, got {value:?}"))
    })
}
