//! Shared helpers for disk cache integration tests
#![allow(dead_code)]

use stashd_cache::{DiskCacheConfig, FileName};
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A 64 character digest whose shard is `{n:02x}`
pub fn hash(n: u8) -> String {
    format!("{n:02x}{}", "0".repeat(62))
}

/// A 64 character digest distinguished by both shard and tail
pub fn hash_in_shard(shard: u8, tail: u8) -> String {
    format!("{shard:02x}{}{tail:02x}", "0".repeat(60))
}

/// Temporary cache root that can be seeded with files of known age
pub struct CacheDir {
    temp_dir: TempDir,
}

impl CacheDir {
    pub fn new() -> Self {
        stashd_utils::tracing::init_for_tests();
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self, max_size: u64) -> DiskCacheConfig {
        DiskCacheConfig::builder()
            .with_base_dir(self.path())
            .with_max_size(max_size)
            .with_max_concurrent_removals(8)
            .with_scan_workers(4)
            .with_migration_workers(4)
            .build()
            .unwrap()
    }

    /// Write `len` bytes at `relative`, last accessed `age` ago
    pub fn write(&self, relative: &str, len: usize, age: Duration) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, vec![b'x'; len]).unwrap();
        set_age(&path, age);
        path
    }

    /// Relative paths of every file under the current layout, sorted
    pub fn current_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        for kind_dir in ["ac.v2", "cas.v2", "raw.v2"] {
            let kind_path = self.path().join(kind_dir);
            let Ok(shards) = fs::read_dir(&kind_path) else {
                continue;
            };
            for shard in shards {
                let shard = shard.unwrap();
                for file in fs::read_dir(shard.path()).unwrap() {
                    let file = file.unwrap();
                    files.push(format!(
                        "{kind_dir}/{}/{}",
                        shard.file_name().to_str().unwrap(),
                        file.file_name().to_str().unwrap()
                    ));
                }
            }
        }
        files.sort();
        files
    }

    /// Assert every file under the current layout satisfies the grammar
    pub fn assert_all_names_parse(&self) {
        for file in self.current_files() {
            let name = file.rsplit('/').next().unwrap();
            assert!(FileName::parse(name).is_ok(), "unparseable file {file}");
        }
    }
}

/// Set both access and modification time to `age` before now
pub fn set_age(path: &Path, age: Duration) {
    let when = SystemTime::now() - age;
    let times = FileTimes::new().set_accessed(when).set_modified(when);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_times(times)
        .unwrap();
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
