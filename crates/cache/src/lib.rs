//! Disk storage engine for stashd
//!
//! This crate keeps cached build artifacts on a local filesystem:
//! - Sharded on-disk layout with a strict filename grammar
//! - In-place migration of legacy layouts
//! - Startup index rebuilt from disk in recency order
//! - Size-bounded LRU eviction with background file removal

pub mod cleanup;
pub mod codec;
pub mod config;
pub mod entry;
pub mod errors;
pub mod eviction;
pub mod keys;
pub mod layout;
pub mod manager;
pub(crate) mod pool;

pub use cleanup::{FileRemover, DEFAULT_MAX_CONCURRENT_REMOVALS};
pub use codec::{relative_path, CodecError, CodecErrorKind, FileName};
pub use config::{DiskCacheConfig, DiskCacheConfigBuilder, DiskCacheConfigLoader};
pub use entry::Record;
pub use errors::{CacheError, Error, RecoveryHint, Result, StartupStage};
pub use eviction::{EvictionListener, SizedLru};
pub use keys::{ContentHash, EntryKind, Key, LAYOUT_VERSION};
pub use manager::{
    DirectoryScanner, DiskCache, IndexBuilder, LayoutMigrator, LoadStats, MigrationStats,
    ScannedFile,
};
