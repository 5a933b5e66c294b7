//! Legacy layout migration
//!
//! Two older layouts are upgraded in place into the sharded `<kind>.v2`
//! layout before the cache is scanned:
//!
//! ```text
//! <root>/<kind>/<hash>            flat
//! <root>/<kind>/<shard>/<hash>    sharded, unversioned
//! ```
//!
//! Flat files are tolerated loosely (anything unexpected is skipped with a
//! warning) because nothing ever validated that directory. Files nested in
//! a legacy shard were validated when they were written, so an unexpected
//! name there fails the migration.

use crate::codec::LEGACY_SUFFIX;
use crate::errors::{CacheError, Result};
use crate::keys::{ContentHash, EntryKind};
use crate::layout;
use crate::pool;
use crossbeam::channel::Sender;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

/// Token given to files moved out of the flat layout. It is not random:
/// the flat layout held at most one file per hash.
pub const FLAT_TOKEN: &str = "222444666";

/// Token given to CAS files moved out of a legacy shard
pub const SHARDED_CAS_TOKEN: &str = "556677";

/// Token given to AC and RAW files moved out of a legacy shard
pub const SHARDED_TOKEN: &str = "112233";

/// What happened to one legacy file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Moved,
    Skipped,
}

/// Totals for one migration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Legacy kind directories found and removed
    pub directories: usize,
    /// Files renamed into the current layout
    pub moved: usize,
    /// Files left behind with a warning; they are deleted with their
    /// legacy directory
    pub skipped: usize,
}

/// Upgrades legacy layouts under a cache root
#[derive(Debug, Clone)]
pub struct LayoutMigrator {
    root: PathBuf,
    workers: usize,
}

impl LayoutMigrator {
    pub fn new(root: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            root: root.into(),
            workers: workers.max(1),
        }
    }

    /// Migrate every legacy kind directory, in the order AC, CAS, RAW
    ///
    /// The shard directories of the current layout must already exist.
    pub fn migrate(&self) -> Result<MigrationStats> {
        let mut stats = MigrationStats::default();
        for kind in EntryKind::ALL {
            if let Some((moved, skipped)) = self.migrate_kind(kind)? {
                stats.directories += 1;
                stats.moved += moved;
                stats.skipped += skipped;
            }
        }
        Ok(stats)
    }

    /// Migrate one legacy directory; `None` if there was nothing to migrate
    fn migrate_kind(&self, kind: EntryKind) -> Result<Option<(usize, usize)>> {
        let source_dir = self.root.join(kind.legacy_dir_name());
        match fs::symlink_metadata(&source_dir) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::migration_io(&source_dir, "stat legacy directory", e)),
        }

        let items = fs::read_dir(&source_dir)
            .and_then(|entries| entries.collect::<io::Result<Vec<DirEntry>>>())
            .map_err(|e| CacheError::migration_io(&source_dir, "read legacy directory", e))?;

        tracing::info!(
            dir = %source_dir.display(),
            items = items.len(),
            workers = self.workers,
            "migrating legacy cache layout"
        );

        let target_dir = self.root.join(kind.dir_name());
        let outcomes = pool::run("migration", self.workers, items, |item, out: &Sender<Outcome>| {
            migrate_item(kind, &item, &target_dir, out)
        })?;

        let moved = outcomes.iter().filter(|o| **o == Outcome::Moved).count();
        let skipped = outcomes.len() - moved;

        fs::remove_dir_all(&source_dir)
            .map_err(|e| CacheError::migration_io(&source_dir, "remove legacy directory", e))?;

        tracing::info!(
            dir = %source_dir.display(),
            moved,
            skipped,
            "finished migrating legacy cache layout"
        );
        Ok(Some((moved, skipped)))
    }
}

fn migrate_item(
    kind: EntryKind,
    item: &DirEntry,
    target_dir: &Path,
    out: &Sender<Outcome>,
) -> Result<()> {
    let path = item.path();
    let file_type = item
        .file_type()
        .map_err(|e| CacheError::migration_io(&path, "read file type", e))?;

    if file_type.is_dir() {
        let name = item.file_name();
        if !name.to_str().is_some_and(layout::is_shard_name) {
            tracing::warn!(dir = %path.display(), "unexpected directory in legacy layout");
        }
        return migrate_shard(kind, &path, target_dir, out);
    }

    if !file_type.is_file() {
        tracing::warn!(path = %path.display(), "skipping non-regular file");
        let _ = out.send(Outcome::Skipped);
        return Ok(());
    }

    let hash = match item.file_name().to_str().map(ContentHash::parse) {
        Some(Ok(hash)) => hash,
        _ => {
            tracing::warn!(path = %path.display(), "skipping unexpected file");
            let _ = out.send(Outcome::Skipped);
            return Ok(());
        }
    };

    let legacy = kind == EntryKind::Cas;
    let dest = target_dir
        .join(hash.shard())
        .join(migrated_name(&hash, FLAT_TOKEN, legacy));
    rename(&path, &dest)?;
    let _ = out.send(Outcome::Moved);
    Ok(())
}

/// Move every file of a legacy shard directory into the current layout
fn migrate_shard(kind: EntryKind, dir: &Path, target_dir: &Path, out: &Sender<Outcome>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CacheError::migration_io(dir, "read legacy shard", e))?;

    let (token, legacy) = match kind {
        EntryKind::Cas => (SHARDED_CAS_TOKEN, true),
        EntryKind::Ac | EntryKind::Raw => (SHARDED_TOKEN, false),
    };

    for entry in entries {
        let entry = entry.map_err(|e| CacheError::migration_io(dir, "read legacy shard", e))?;
        let path = entry.path();
        let is_file = entry
            .file_type()
            .map_err(|e| CacheError::migration_io(&path, "read file type", e))?
            .is_file();

        let hash = match entry.file_name().to_str().map(ContentHash::parse) {
            Some(Ok(hash)) if is_file => hash,
            _ => return Err(CacheError::migration(&path, "unexpected entry in legacy shard")),
        };

        let dest = target_dir
            .join(hash.shard())
            .join(migrated_name(&hash, token, legacy));
        rename(&path, &dest)?;
        let _ = out.send(Outcome::Moved);
    }
    Ok(())
}

fn migrated_name(hash: &ContentHash, token: &str, legacy: bool) -> String {
    let suffix = if legacy { LEGACY_SUFFIX } else { "" };
    format!("{hash}-{token}{suffix}")
}

fn rename(src: &Path, dest: &Path) -> Result<()> {
    tracing::debug!(from = %src.display(), to = %dest.display(), "migrating file");
    fs::rename(src, dest).map_err(|e| CacheError::migration_io(src, "rename into current layout", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FileName;
    use tempfile::TempDir;

    const HASH_A: &str = "aa00000000000000000000000000000000000000000000000000000000000001";
    const HASH_B: &str = "bb00000000000000000000000000000000000000000000000000000000000002";

    fn setup() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        layout::ensure_shard_dirs(temp_dir.path()).unwrap();
        temp_dir
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_nothing_to_migrate() {
        let temp_dir = setup();
        let stats = LayoutMigrator::new(temp_dir.path(), 2).migrate().unwrap();
        assert_eq!(stats, MigrationStats::default());
    }

    #[test]
    fn test_flat_layout_is_migrated() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir(root.join("cas")).unwrap();
        fs::create_dir(root.join("ac")).unwrap();
        fs::write(root.join("cas").join(HASH_A), b"blob").unwrap();
        fs::write(root.join("ac").join(HASH_B), b"result").unwrap();

        let stats = LayoutMigrator::new(root, 4).migrate().unwrap();
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.moved, 2);
        assert!(!root.join("cas").exists());
        assert!(!root.join("ac").exists());

        let cas = names_in(&root.join("cas.v2").join("aa"));
        assert_eq!(cas, vec![format!("{HASH_A}-222444666.v1")]);
        let ac = names_in(&root.join("ac.v2").join("bb"));
        assert_eq!(ac, vec![format!("{HASH_B}-222444666")]);

        for name in cas.iter().chain(&ac) {
            assert!(FileName::parse(name).is_ok());
        }
    }

    #[test]
    fn test_sharded_layout_is_migrated() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("cas").join("aa")).unwrap();
        fs::create_dir_all(root.join("raw").join("bb")).unwrap();
        fs::write(root.join("cas").join("aa").join(HASH_A), b"blob").unwrap();
        fs::write(root.join("raw").join("bb").join(HASH_B), b"raw").unwrap();

        let stats = LayoutMigrator::new(root, 2).migrate().unwrap();
        assert_eq!(stats.moved, 2);

        assert_eq!(
            names_in(&root.join("cas.v2").join("aa")),
            vec![format!("{HASH_A}-556677.v1")]
        );
        assert_eq!(
            names_in(&root.join("raw.v2").join("bb")),
            vec![format!("{HASH_B}-112233")]
        );
        assert!(!root.join("cas").exists());
        assert!(!root.join("raw").exists());
    }

    #[test]
    fn test_unexpected_flat_files_are_skipped() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir(root.join("raw")).unwrap();
        fs::write(root.join("raw").join("notes.txt"), b"junk").unwrap();
        fs::write(root.join("raw").join(HASH_A), b"raw").unwrap();

        let stats = LayoutMigrator::new(root, 2).migrate().unwrap();
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.skipped, 1);
        // The skipped file goes away with the legacy directory
        assert!(!root.join("raw").exists());
    }

    #[test]
    fn test_bad_name_in_legacy_shard_fails() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("ac").join("aa")).unwrap();
        fs::write(root.join("ac").join("aa").join("not-a-hash"), b"x").unwrap();

        let err = LayoutMigrator::new(root, 2).migrate().unwrap_err();
        assert!(matches!(err, CacheError::Migration { .. }));
        // A failed pass leaves the legacy tree for inspection
        assert!(root.join("ac").exists());
    }

    #[test]
    fn test_unexpected_shard_name_still_migrates() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("ac").join("misc")).unwrap();
        fs::write(root.join("ac").join("misc").join(HASH_B), b"x").unwrap();

        LayoutMigrator::new(root, 1).migrate().unwrap();
        assert_eq!(
            names_in(&root.join("ac.v2").join("bb")),
            vec![format!("{HASH_B}-112233")]
        );
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let temp_dir = setup();
        let root = temp_dir.path();
        fs::create_dir(root.join("cas")).unwrap();
        fs::write(root.join("cas").join(HASH_A), b"blob").unwrap();

        let migrator = LayoutMigrator::new(root, 2);
        assert_eq!(migrator.migrate().unwrap().moved, 1);
        assert_eq!(migrator.migrate().unwrap(), MigrationStats::default());
    }
}
