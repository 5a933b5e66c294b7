//! Directory layout of a cache root
//!
//! ```text
//! <root>/<kind>.v2/<shard>/<hash>[-<logicalSize>]-<token>[.v1]
//! ```

use crate::errors::{CacheError, Result};
use crate::keys::EntryKind;
use std::fs;
use std::path::Path;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// All 256 shard directory names, `00` through `ff`
pub fn shard_names() -> impl Iterator<Item = String> {
    HEX.iter().flat_map(|&hi| {
        HEX.iter()
            .map(move |&lo| String::from_utf8_lossy(&[hi, lo]).into_owned())
    })
}

/// Whether `name` is a two character lowercase hex shard name
pub fn is_shard_name(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| HEX.contains(&b))
}

/// Create every kind directory and its 256 shards under `root`
pub fn ensure_shard_dirs(root: &Path) -> Result<()> {
    for kind in EntryKind::ALL {
        let kind_dir = root.join(kind.dir_name());
        for shard in shard_names() {
            let dir = kind_dir.join(&shard);
            fs::create_dir_all(&dir)
                .map_err(|e| CacheError::io(&dir, "create shard directory", e))?;
        }
    }
    Ok(())
}
