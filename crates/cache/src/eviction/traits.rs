//! Eviction listener trait definition

use crate::entry::Record;
use crate::keys::Key;

/// Receives every record that leaves the index without being explicitly
/// removed: LRU evictions and records displaced by a newer record for the
/// same key. A displaced record that names the same file as its replacement
/// is not reported, since that file is still live.
///
/// Called while the index lock is held. Implementations must not call back
/// into the index and should hand any slow work off to another task.
pub trait EvictionListener: Send + Sync {
    fn on_evict(&self, key: &Key, record: &Record);
}

impl<F> EvictionListener for F
where
    F: Fn(&Key, &Record) + Send + Sync,
{
    fn on_evict(&self, key: &Key, record: &Record) {
        self(key, record)
    }
}
