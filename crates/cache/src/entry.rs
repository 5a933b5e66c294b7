//! Index records
//!
//! A [`Record`] is what the index keeps per key: enough to rebuild the
//! on-disk filename and to account for the bytes the file occupies.

use crate::codec::{self, FileName};
use crate::errors::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Value held in the LRU index for each key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    logical_size: u64,
    size_on_disk: u64,
    legacy: bool,
    random: String,
    /// Whether the filename carries the logical size segment. Files
    /// migrated from the legacy layouts do not.
    sized_name: bool,
}

impl Record {
    /// Create a record, rejecting tokens that cannot appear in a filename
    pub fn new(
        logical_size: u64,
        size_on_disk: u64,
        legacy: bool,
        random: impl Into<String>,
    ) -> Result<Self> {
        let random = random.into();
        if !codec::is_valid_token(&random) {
            return Err(CacheError::invalid_key(
                random,
                "random token must be non-empty ASCII alphanumeric",
            ));
        }
        Ok(Self {
            logical_size,
            size_on_disk,
            legacy,
            random,
            sized_name: true,
        })
    }

    /// Record for a new file, with a freshly generated token
    pub fn with_random_token(logical_size: u64, size_on_disk: u64, legacy: bool) -> Self {
        Self {
            logical_size,
            size_on_disk,
            legacy,
            random: codec::generate_token(),
            sized_name: true,
        }
    }

    /// Record for a decoded filename whose file occupies `size_on_disk`
    /// bytes. Names without a size segment use the on-disk size.
    pub fn from_file_name(name: &FileName, size_on_disk: u64) -> Self {
        Self {
            logical_size: name.logical_size.unwrap_or(size_on_disk),
            size_on_disk,
            legacy: name.legacy,
            random: name.random.clone(),
            sized_name: name.logical_size.is_some(),
        }
    }

    pub fn logical_size(&self) -> u64 {
        self.logical_size
    }

    pub fn size_on_disk(&self) -> u64 {
        self.size_on_disk
    }

    pub fn legacy(&self) -> bool {
        self.legacy
    }

    pub fn random(&self) -> &str {
        &self.random
    }

    /// Whether a CAS filename for this record includes the logical size
    pub fn has_sized_name(&self) -> bool {
        self.sized_name
    }
}
