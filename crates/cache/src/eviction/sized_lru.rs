//! LRU index bounded by total on-disk bytes

use crate::codec::FileName;
use crate::entry::Record;
use crate::eviction::traits::EvictionListener;
use crate::keys::Key;
use lru::LruCache;
use parking_lot::Mutex;

struct LruState {
    entries: LruCache<Key, Record>,
    current_size: u64,
}

/// Recency-ordered index bounded by the sum of `size_on_disk`
///
/// All mutation happens under a single mutex, and the eviction listener
/// runs while that mutex is held so it always observes a consistent index.
pub struct SizedLru {
    state: Mutex<LruState>,
    max_size: u64,
    listener: Box<dyn EvictionListener>,
}

impl SizedLru {
    pub fn new(max_size: u64, listener: impl EvictionListener + 'static) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: LruCache::unbounded(),
                current_size: 0,
            }),
            max_size,
            listener: Box::new(listener),
        }
    }

    /// Insert or replace `key` as the most recently used entry
    ///
    /// Returns `false` when the record alone is larger than the budget; such
    /// a record is never admitted and the index is left untouched. A record
    /// displaced by the same key is passed to the listener unless it names
    /// the same file as its replacement, then least recently used entries are
    /// evicted until the index fits the budget.
    pub fn insert(&self, key: Key, record: Record) -> bool {
        if record.size_on_disk() > self.max_size {
            return false;
        }

        let file_name = FileName::encode(key.kind, &key.hash, &record);
        let mut state = self.state.lock();
        state.current_size += record.size_on_disk();

        if let Some((old_key, old_record)) = state.entries.push(key, record) {
            state.current_size -= old_record.size_on_disk();
            if FileName::encode(old_key.kind, &old_key.hash, &old_record) == file_name {
                tracing::trace!(key = %old_key, "refreshed entry backed by the same file");
            } else {
                self.listener.on_evict(&old_key, &old_record);
            }
        }

        while state.current_size > self.max_size {
            let Some((evicted_key, evicted)) = state.entries.pop_lru() else {
                break;
            };
            state.current_size -= evicted.size_on_disk();
            tracing::debug!(
                key = %evicted_key,
                size_on_disk = evicted.size_on_disk(),
                "evicting least recently used entry"
            );
            self.listener.on_evict(&evicted_key, &evicted);
        }

        true
    }

    /// Look up `key` and mark it most recently used
    pub fn get(&self, key: &Key) -> Option<Record> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Look up `key` without changing its position
    pub fn peek(&self, key: &Key) -> Option<Record> {
        self.state.lock().entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.state.lock().entries.contains(key)
    }

    /// Remove `key` without notifying the listener
    pub fn remove(&self, key: &Key) -> Option<Record> {
        let mut state = self.state.lock();
        let record = state.entries.pop(key)?;
        state.current_size -= record.size_on_disk();
        Some(record)
    }

    /// Least recently used entry
    pub fn oldest(&self) -> Option<(Key, Record)> {
        self.state
            .lock()
            .entries
            .peek_lru()
            .map(|(key, record)| (key.clone(), record.clone()))
    }

    /// All entries, least recently used first
    pub fn snapshot(&self) -> Vec<(Key, Record)> {
        self.state
            .lock()
            .entries
            .iter()
            .rev()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of `size_on_disk` over all indexed records
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}

impl std::fmt::Debug for SizedLru {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SizedLru")
            .field("entries", &state.entries.len())
            .field("current_size", &state.current_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}
