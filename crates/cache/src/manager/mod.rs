//! Disk cache manager
//!
//! [`DiskCache::open`] runs the startup sequence (directories, legacy
//! migration, scan, index build) and hands back a cache whose index already
//! mirrors the disk. Any startup failure is fatal.

mod loader;
mod migration;
mod scanner;

pub use loader::{IndexBuilder, LoadStats};
pub use migration::{LayoutMigrator, MigrationStats, FLAT_TOKEN, SHARDED_CAS_TOKEN, SHARDED_TOKEN};
pub use scanner::{DirectoryScanner, ScannedFile};

use crate::cleanup::FileRemover;
use crate::codec;
use crate::config::DiskCacheConfig;
use crate::entry::Record;
use crate::errors::{CacheError, Result, StartupStage};
use crate::eviction::SizedLru;
use crate::keys::{ContentHash, EntryKind, Key};
use crate::layout;
use stashd_utils::tracing::startup_span;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;

/// A disk-backed cache directory with its recency index
pub struct DiskCache {
    root: PathBuf,
    lru: SizedLru,
    remover: FileRemover,
    load_stats: LoadStats,
}

impl DiskCache {
    /// Open the cache described by `config`
    ///
    /// Startup work runs on the blocking thread pool. Evicted files are
    /// removed by tasks spawned on the current runtime.
    pub async fn open(config: DiskCacheConfig) -> Result<Self> {
        config.validate()?;
        let remover = FileRemover::new(config.max_concurrent_removals, Handle::current());

        let listener_remover = remover.clone();
        let (root, lru, load_stats) =
            tokio::task::spawn_blocking(move || start(&config, listener_remover)).await??;

        tracing::info!(
            root = %root.display(),
            entries = load_stats.indexed,
            bytes = load_stats.bytes_indexed,
            max_bytes = lru.max_size(),
            "disk cache ready"
        );

        Ok(Self {
            root,
            lru,
            remover,
            load_stats,
        })
    }

    /// Register a file that is already in place at [`Self::path_for`]
    ///
    /// Returns whether the index admitted it. A refused file is queued for
    /// removal, as is an older file for the same key or one evicted to make
    /// room. Registering the same file again only refreshes its recency.
    pub fn insert(&self, kind: EntryKind, hash: ContentHash, record: Record) -> Result<bool> {
        if kind.has_logical_size() && record.has_sized_name() && record.logical_size() == 0 {
            return Err(CacheError::invalid_key(
                hash.as_str(),
                "cas entries must have a positive logical size",
            ));
        }

        let key = Key::new(kind, hash);
        let path = self.path_for(&key, &record);
        let admitted = self.lru.insert(key, record);
        if !admitted {
            tracing::debug!(path = %path.display(), "index refused entry larger than the cache");
            self.remover.remove(path);
        }
        Ok(admitted)
    }

    /// Look up an entry and mark it most recently used
    pub fn get(&self, kind: EntryKind, hash: &ContentHash) -> Option<Record> {
        self.lru.get(&Key::new(kind, hash.clone()))
    }

    /// Whether an entry is indexed, without touching it
    pub fn contains(&self, kind: EntryKind, hash: &ContentHash) -> bool {
        self.lru.contains(&Key::new(kind, hash.clone()))
    }

    /// Absolute path of the file backing `record`
    pub fn path_for(&self, key: &Key, record: &Record) -> PathBuf {
        self.root.join(codec::relative_path(key, record))
    }

    /// Time since the least recently used file was last accessed
    ///
    /// `None` when the index is empty, or when that file disappeared between
    /// the lookup and the stat.
    pub fn longest_idle_time(&self) -> Result<Option<Duration>> {
        let Some((key, record)) = self.lru.oldest() else {
            return Ok(None);
        };
        let path = self.path_for(&key, &record);
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, "stat oldest entry", e)),
        };
        let accessed = metadata
            .accessed()
            .or_else(|_| metadata.modified())
            .map_err(|e| CacheError::io(&path, "read access time", e))?;

        Ok(Some(
            SystemTime::now()
                .duration_since(accessed)
                .unwrap_or(Duration::ZERO),
        ))
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Bytes on disk accounted for by the index
    pub fn current_size(&self) -> u64 {
        self.lru.current_size()
    }

    pub fn max_size(&self) -> u64 {
        self.lru.max_size()
    }

    /// Canonical cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &SizedLru {
        &self.lru
    }

    /// Remover backing eviction; await [`FileRemover::wait_idle`] before
    /// shutting down to let queued deletions finish
    pub fn remover(&self) -> &FileRemover {
        &self.remover
    }

    /// What the startup index build found
    pub fn load_stats(&self) -> LoadStats {
        self.load_stats
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("root", &self.root)
            .field("index", &self.lru)
            .field("remover", &self.remover)
            .finish()
    }
}

fn start(config: &DiskCacheConfig, remover: FileRemover) -> Result<(PathBuf, SizedLru, LoadStats)> {
    let root = prepare_root(&config.base_dir)
        .map_err(|e| failed(StartupStage::CreateDirectories, e))?;

    let migration = run_stage(StartupStage::Migration, &root, || {
        LayoutMigrator::new(&root, config.effective_migration_workers()).migrate()
    })?;
    if migration.directories > 0 {
        tracing::info!(
            moved = migration.moved,
            skipped = migration.skipped,
            "migrated legacy cache layout"
        );
    }

    let files = run_stage(StartupStage::Scan, &root, || {
        DirectoryScanner::new(&root, config.effective_scan_workers()).scan()
    })?;

    let listener_root = root.clone();
    let lru = SizedLru::new(config.max_size_bytes, move |key: &Key, record: &Record| {
        remover.remove(listener_root.join(codec::relative_path(key, record)));
    });

    let stats = run_stage(StartupStage::BuildIndex, &root, || {
        IndexBuilder::new(&root, &lru).build(files)
    })?;

    Ok((root, lru, stats))
}

/// Create the root and every shard directory, returning the canonical root
fn prepare_root(base_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base_dir)
        .map_err(|e| CacheError::io(base_dir, "create cache directory", e))?;
    let root = fs::canonicalize(base_dir)
        .map_err(|e| CacheError::io(base_dir, "resolve cache directory", e))?;
    layout::ensure_shard_dirs(&root)?;
    Ok(root)
}

/// Run one startup stage inside its span, tagging any error with the stage
fn run_stage<T>(stage: StartupStage, root: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _span = startup_span(stage.as_str(), root).entered();
    f().map_err(|e| failed(stage, e))
}

fn failed(stage: StartupStage, source: CacheError) -> CacheError {
    tracing::error!(stage = stage.as_str(), error = %source, "cache startup failed");
    CacheError::startup(stage, source)
}
