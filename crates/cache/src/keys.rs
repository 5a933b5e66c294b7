//! Logical cache keys
//!
//! A key is the pair of an entry kind and a 64 character lowercase hex
//! digest. Keys never carry on-disk details such as sizes or tokens; those
//! live in [`crate::entry::Record`].

use crate::codec::{self, CodecError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation of the on-disk layout this crate reads and writes
pub const LAYOUT_VERSION: &str = "v2";

/// Kind of cached entry; each kind owns one top-level directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Action results
    Ac,
    /// Content-addressed blobs, possibly compressed
    Cas,
    /// Uninterpreted raw blobs
    Raw,
}

impl EntryKind {
    /// All kinds, in the order legacy directories are migrated
    pub const ALL: [EntryKind; 3] = [EntryKind::Ac, EntryKind::Cas, EntryKind::Raw];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Cas => "cas",
            Self::Raw => "raw",
        }
    }

    /// Directory name in the current layout, e.g. `cas.v2`
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Ac => "ac.v2",
            Self::Cas => "cas.v2",
            Self::Raw => "raw.v2",
        }
    }

    /// Unversioned directory name used by the legacy layouts
    pub const fn legacy_dir_name(self) -> &'static str {
        self.as_str()
    }

    /// Decode a kind from a current-layout directory name
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.dir_name() == name)
    }

    /// Whether filenames of this kind carry the logical size segment
    pub const fn has_logical_size(self) -> bool {
        matches!(self, Self::Cas)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated 64 character lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse a digest, rejecting anything that is not exactly 64 lowercase
    /// hex characters
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        codec::parse_hash(input).map(|hash| Self(hash.to_string()))
    }

    pub(crate) fn from_validated(hash: &str) -> Self {
        debug_assert!(codec::is_valid_hash(hash));
        Self(hash.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two character shard directory this digest lives in
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Logical identity of a cached item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub kind: EntryKind,
    pub hash: ContentHash,
}

impl Key {
    pub fn new(kind: EntryKind, hash: ContentHash) -> Self {
        Self { kind, hash }
    }

    /// Build a key from a raw digest string
    pub fn parse(kind: EntryKind, hash: &str) -> Result<Self, CodecError> {
        Ok(Self::new(kind, ContentHash::parse(hash)?))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.hash)
    }
}
