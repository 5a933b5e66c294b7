//! Size-bounded LRU index
//!
//! The index maps every cached key to its [`Record`](crate::entry::Record)
//! in recency order and keeps the aggregate on-disk size under a budget.
//! Records pushed out of the index are reported to an [`EvictionListener`],
//! which is responsible for removing the backing file.

mod sized_lru;
mod traits;

pub use sized_lru::SizedLru;
pub use traits::EvictionListener;
