//! Startup index builder
//!
//! Replays scanned files into the index oldest first. The index puts every
//! insert at the most recent position, so after the pass the recency order
//! matches the access times the files had on disk.

use super::scanner::ScannedFile;
use crate::codec::FileName;
use crate::entry::Record;
use crate::errors::{CacheError, Result};
use crate::eviction::SizedLru;
use crate::keys::{EntryKind, Key};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path};

/// Totals for one index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Files handed to the builder
    pub files_seen: usize,
    /// Entries in the index once the pass completes
    pub indexed: usize,
    /// Files refused by the index and deleted during the pass
    pub rejected: usize,
    /// Older files sharing a key with a more recent one, deleted during the
    /// pass
    pub duplicates: usize,
    /// Files admitted but later evicted to stay within budget
    pub displaced: usize,
    /// Bytes on disk accounted for by the index
    pub bytes_indexed: u64,
}

/// Populates a [`SizedLru`] from a directory listing
pub struct IndexBuilder<'a> {
    root: &'a Path,
    lru: &'a SizedLru,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(root: &'a Path, lru: &'a SizedLru) -> Self {
        Self { root, lru }
    }

    /// Insert every file, oldest access time first
    ///
    /// A file whose path or name does not decode fails the whole build, before
    /// anything is inserted. When several files share a key only the most
    /// recently accessed one is inserted; the others are deleted before this
    /// returns, as are files the index refuses. Files evicted to stay within
    /// budget go through the index listener.
    pub fn build(&self, mut files: Vec<ScannedFile>) -> Result<LoadStats> {
        tracing::debug!(files = files.len(), "sorting cache files by access time");
        files.sort_by_key(|file| file.accessed);

        let decoded = files
            .iter()
            .map(|file| decode(&file.relative_path, file.size))
            .collect::<Result<Vec<_>>>()?;

        // Ties on access time go to the file scanned last
        let latest: HashMap<&Key, usize> = decoded
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key, i))
            .collect();

        let mut stats = LoadStats {
            files_seen: files.len(),
            ..LoadStats::default()
        };

        for (i, (file, (key, record))) in files.iter().zip(&decoded).enumerate() {
            if latest.get(key) != Some(&i) {
                self.discard(&file.relative_path, "removing older duplicate")?;
                stats.duplicates += 1;
            } else if !self.lru.insert(key.clone(), record.clone()) {
                self.discard(&file.relative_path, "removing file rejected by the index")?;
                stats.rejected += 1;
            }
        }

        stats.indexed = self.lru.len();
        stats.bytes_indexed = self.lru.current_size();
        stats.displaced = stats
            .files_seen
            .saturating_sub(stats.indexed + stats.rejected + stats.duplicates);

        tracing::info!(
            indexed = stats.indexed,
            rejected = stats.rejected,
            duplicates = stats.duplicates,
            displaced = stats.displaced,
            bytes = stats.bytes_indexed,
            "built cache index"
        );
        Ok(stats)
    }

    /// A file that will not be indexed is unreachable; remove it now
    fn discard(&self, relative_path: &Path, reason: &'static str) -> Result<()> {
        let path = self.root.join(relative_path);
        tracing::debug!(path = %path.display(), "{reason}");
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(path, "remove rejected file", e)),
        }
    }
}

/// Decode `<kind-dir>/<shard>/<filename>` into a key and record
pub(crate) fn decode(relative_path: &Path, size_on_disk: u64) -> Result<(Key, Record)> {
    let unrecognized = |reason: &str| CacheError::unrecognized_file(relative_path, reason);

    let mut parts = relative_path.components().map(|c| match c {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });
    let (Some(Some(kind_dir)), Some(Some(shard)), Some(Some(file_name)), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(unrecognized("expected <kind>/<shard>/<filename>"));
    };

    let kind = EntryKind::from_dir_name(kind_dir)
        .ok_or_else(|| unrecognized("not under a recognized kind directory"))?;
    let name = FileName::parse(file_name).map_err(|e| unrecognized(&e.to_string()))?;

    if name.hash.shard() != shard {
        return Err(unrecognized("stored under the wrong shard"));
    }
    if name.logical_size.is_some() && !kind.has_logical_size() {
        return Err(unrecognized("size segment is only valid for cas entries"));
    }

    let record = Record::from_file_name(&name, size_on_disk);
    Ok((Key::new(kind, name.hash), record))
}
