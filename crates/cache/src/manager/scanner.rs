//! Concurrent scan of the current layout
//!
//! The root must hold exactly the kind directories and each kind directory
//! exactly the shard directories; anything else means the cache was pointed
//! at a foreign or damaged tree and the scan fails. Shards are listed in
//! parallel.

use crate::errors::{CacheError, Result};
use crate::keys::EntryKind;
use crate::layout;
use crate::pool;
use crossbeam::channel::Sender;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file found under a shard directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// `<kind-dir>/<shard>/<filename>`, relative to the cache root
    pub relative_path: PathBuf,
    /// Bytes occupied on disk
    pub size: u64,
    /// Last access time, or modification time where access times are not
    /// available
    pub accessed: SystemTime,
}

/// Lists every cached file under a cache root
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    workers: usize,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            root: root.into(),
            workers: workers.max(1),
        }
    }

    /// Validate the directory structure and list every file
    ///
    /// Output order is unspecified.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let shards = self.shard_dirs()?;
        tracing::info!(
            root = %self.root.display(),
            shards = shards.len(),
            workers = self.workers,
            "scanning cache directory"
        );

        let root = self.root.as_path();
        let files = pool::run("scanner", self.workers, shards, |shard, out| {
            list_shard(root, &shard, out)
        })?;

        tracing::info!(files = files.len(), "finished scanning cache directory");
        Ok(files)
    }

    /// Relative paths of every shard directory, after checking that nothing
    /// else lives at the top two levels
    fn shard_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut shards = Vec::with_capacity(EntryKind::ALL.len() * 256);

        for entry in read_dir(&self.root)? {
            let path = entry.path();
            if !is_dir(&entry)? {
                return Err(CacheError::invalid_layout(path, "unexpected file"));
            }
            let kind_dir = entry.file_name();
            let Some(kind_dir) = kind_dir.to_str().filter(|n| EntryKind::from_dir_name(n).is_some())
            else {
                return Err(CacheError::invalid_layout(path, "unexpected directory"));
            };

            for shard in read_dir(&path)? {
                let shard_path = shard.path();
                if !is_dir(&shard)? {
                    return Err(CacheError::invalid_layout(shard_path, "unexpected file"));
                }
                let name = shard.file_name();
                match name.to_str() {
                    Some(name) if layout::is_shard_name(name) => {
                        shards.push(Path::new(kind_dir).join(name));
                    }
                    _ => return Err(CacheError::invalid_layout(shard_path, "unexpected directory")),
                }
            }
        }

        Ok(shards)
    }
}

fn list_shard(root: &Path, shard: &Path, out: &Sender<ScannedFile>) -> Result<()> {
    for entry in read_dir(&root.join(shard))? {
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|e| CacheError::io(&path, "read file metadata", e))?;

        if metadata.is_dir() {
            return Err(CacheError::invalid_layout(path, "unexpected directory"));
        }
        if !metadata.is_file() {
            return Err(CacheError::invalid_layout(path, "not a regular file"));
        }

        let accessed = metadata
            .accessed()
            .or_else(|_| metadata.modified())
            .map_err(|e| CacheError::io(&path, "read access time", e))?;

        let file = ScannedFile {
            relative_path: shard.join(entry.file_name()),
            size: metadata.len(),
            accessed,
        };
        if out.send(file).is_err() {
            break;
        }
    }
    Ok(())
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    fs::read_dir(dir)
        .and_then(|entries| entries.collect())
        .map_err(|e| CacheError::io(dir, "read cache directory", e))
}

fn is_dir(entry: &fs::DirEntry) -> Result<bool> {
    entry
        .file_type()
        .map(|t| t.is_dir())
        .map_err(|e| CacheError::io(entry.path(), "read file type", e))
}
