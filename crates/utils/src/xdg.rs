use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for stashd
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CACHE_HOME/stashd or fallback
    pub fn cache_dir() -> PathBuf {
        env::var("XDG_CACHE_HOME")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".cache"))
                    .unwrap_or_else(|| PathBuf::from(".cache"))
            })
            .join("stashd")
    }

    /// Default location of the on-disk blob store
    pub fn disk_store_dir() -> PathBuf {
        Self::cache_dir().join("disk")
    }

    /// Get XDG_CONFIG_HOME/stashd or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("stashd")
    }
}
