//! Filename grammar for cached entries
//!
//! ```text
//! name   := hash [ '-' size ] '-' token [ ".v1" ]
//! hash   := [0-9a-f]{64}
//! size   := [1-9][0-9]*
//! token  := [0-9A-Za-z]+
//! ```
//!
//! The size segment is only written for CAS entries (CAS files migrated
//! from the legacy layouts lack it too), and `.v1` marks blobs stored in
//! the legacy uncompressed format. Parsing is strict: a name that
//! deviates from the grammar in any way is rejected.

use crate::entry::Record;
use crate::keys::{ContentHash, EntryKind, Key};
use std::path::PathBuf;
use thiserror::Error;

/// Length of a hex encoded SHA-256 digest
pub const HASH_LEN: usize = 64;

/// Suffix marking the legacy uncompressed sub-format
pub const LEGACY_SUFFIX: &str = ".v1";

/// Length of generated random tokens
pub const TOKEN_LEN: usize = 16;

/// Grammar element that failed to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecErrorKind {
    #[error("expected {HASH_LEN} lowercase hex characters")]
    Hash,
    #[error("expected '-' after the hash")]
    Separator,
    #[error("logical size must be a positive decimal integer without leading zeros")]
    Size,
    #[error("missing random token")]
    MissingToken,
    #[error("random token must be ASCII alphanumeric")]
    Token,
    #[error("unexpected trailing characters")]
    Trailing,
}

/// A name or digest that does not match the filename grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cache filename {input:?}: {kind}")]
pub struct CodecError {
    input: String,
    kind: CodecErrorKind,
}

impl CodecError {
    fn new(input: &str, kind: CodecErrorKind) -> Self {
        Self {
            input: input.to_string(),
            kind,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn kind(&self) -> CodecErrorKind {
        self.kind
    }
}

/// Decoded filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    pub hash: ContentHash,
    /// Present only when the name carries the size segment
    pub logical_size: Option<u64>,
    pub random: String,
    pub legacy: bool,
}

impl FileName {
    /// Decode a filename
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        let fail = |kind| CodecError::new(name, kind);

        let (hash, rest) = hash(name).map_err(fail)?;
        let (first, rest) = dash_segment(rest).map_err(fail)?;
        let (second, rest) = optional(dash_segment, rest);
        let (legacy, rest) = optional(legacy_suffix, rest);
        end(rest).map_err(fail)?;

        let (logical_size, token) = match second {
            Some(token) => (Some(size(first).map_err(fail)?), token),
            None => (None, first),
        };
        validate_token(token).map_err(fail)?;

        Ok(Self {
            hash: ContentHash::from_validated(hash),
            logical_size,
            random: token.to_string(),
            legacy: legacy.is_some(),
        })
    }

    /// Encode the filename for `record` stored under `kind`
    pub fn encode(kind: EntryKind, hash: &ContentHash, record: &Record) -> String {
        let suffix = if record.legacy() { LEGACY_SUFFIX } else { "" };
        if kind.has_logical_size() && record.has_sized_name() {
            format!(
                "{hash}-{}-{}{suffix}",
                record.logical_size(),
                record.random()
            )
        } else {
            format!("{hash}-{}{suffix}", record.random())
        }
    }
}

/// `<kind-dir>/<shard>/<filename>` relative to the cache root
pub fn relative_path(key: &Key, record: &Record) -> PathBuf {
    PathBuf::from(key.kind.dir_name())
        .join(key.hash.shard())
        .join(FileName::encode(key.kind, &key.hash, record))
}

/// Validate a bare digest
pub(crate) fn parse_hash(input: &str) -> Result<&str, CodecError> {
    let fail = |kind| CodecError::new(input, kind);
    let (hash, rest) = hash(input).map_err(fail)?;
    end(rest).map_err(fail)?;
    Ok(hash)
}

pub fn is_valid_hash(input: &str) -> bool {
    parse_hash(input).is_ok()
}

pub fn is_valid_token(input: &str) -> bool {
    validate_token(input).is_ok()
}

/// Fresh random token for a newly written file
pub fn generate_token() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(TOKEN_LEN)
        .collect()
}

type Parsed<'a, T> = Result<(T, &'a str), CodecErrorKind>;

fn hash(input: &str) -> Parsed<'_, &str> {
    let (candidate, rest) = take_while(input, |c| c.is_ascii_digit() || matches!(c, 'a'..='f'));
    if candidate.len() != HASH_LEN {
        return Err(CodecErrorKind::Hash);
    }
    Ok((candidate, rest))
}

fn dash_segment(input: &str) -> Parsed<'_, &str> {
    let rest = input.strip_prefix('-').ok_or(if input.is_empty() {
        CodecErrorKind::MissingToken
    } else {
        CodecErrorKind::Separator
    })?;
    let (segment, rest) = take_while(rest, |c| c.is_ascii_alphanumeric());
    if segment.is_empty() {
        return Err(CodecErrorKind::MissingToken);
    }
    Ok((segment, rest))
}

fn legacy_suffix(input: &str) -> Parsed<'_, ()> {
    input
        .strip_prefix(LEGACY_SUFFIX)
        .map(|rest| ((), rest))
        .ok_or(CodecErrorKind::Trailing)
}

fn size(segment: &str) -> Result<u64, CodecErrorKind> {
    let mut chars = segment.chars();
    let leading_ok = matches!(chars.next(), Some('1'..='9'));
    if !leading_ok || !chars.all(|c| c.is_ascii_digit()) {
        return Err(CodecErrorKind::Size);
    }
    segment.parse().map_err(|_| CodecErrorKind::Size)
}

fn validate_token(token: &str) -> Result<(), CodecErrorKind> {
    if token.is_empty() {
        return Err(CodecErrorKind::MissingToken);
    }
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CodecErrorKind::Token);
    }
    Ok(())
}

fn end(input: &str) -> Result<(), CodecErrorKind> {
    if input.is_empty() {
        Ok(())
    } else {
        Err(CodecErrorKind::Trailing)
    }
}

fn optional<'a, T>(parser: impl Fn(&'a str) -> Parsed<'a, T>, input: &'a str) -> (Option<T>, &'a str) {
    match parser(input) {
        Ok((value, rest)) => (Some(value), rest),
        Err(_) => (None, input),
    }
}

fn take_while(input: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(input.len(), |(idx, _)| idx);
    input.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

    fn record(logical: u64, on_disk: u64, legacy: bool, random: &str) -> Record {
        Record::new(logical, on_disk, legacy, random).unwrap()
    }

    #[test]
    fn test_parse_compressed_cas() {
        let name = FileName::parse(&format!("{HASH}-1234-abcXYZ09")).unwrap();
        assert_eq!(name.hash.as_str(), HASH);
        assert_eq!(name.logical_size, Some(1234));
        assert_eq!(name.random, "abcXYZ09");
        assert!(!name.legacy);
    }

    #[test]
    fn test_parse_legacy_cas() {
        let name = FileName::parse(&format!("{HASH}-7-556677.v1")).unwrap();
        assert_eq!(name.logical_size, Some(7));
        assert_eq!(name.random, "556677");
        assert!(name.legacy);
    }

    #[test]
    fn test_parse_ac_without_size() {
        let name = FileName::parse(&format!("{HASH}-112233")).unwrap();
        assert_eq!(name.logical_size, None);
        assert_eq!(name.random, "112233");
        assert!(!name.legacy);
    }

    #[test]
    fn test_rejects_deviations() {
        let cases = [
            (format!("{HASH}"), CodecErrorKind::MissingToken),
            (format!("{HASH}-"), CodecErrorKind::MissingToken),
            (format!("{HASH}--abc"), CodecErrorKind::MissingToken),
            (format!("{HASH}-0-abc"), CodecErrorKind::Size),
            (format!("{HASH}-012-abc"), CodecErrorKind::Size),
            (format!("{HASH}-abc-def"), CodecErrorKind::Size),
            (format!("{HASH}-1-2-abc"), CodecErrorKind::Trailing),
            (format!("{HASH}-abc.v2"), CodecErrorKind::Trailing),
            (format!("{HASH}-abc.v1.v1"), CodecErrorKind::Trailing),
            (format!("{HASH}-abc_def"), CodecErrorKind::Trailing),
            (format!("{HASH}x-abc"), CodecErrorKind::Separator),
            (format!("{HASH}0-abc"), CodecErrorKind::Hash),
            (format!("{}-abc", &HASH[..63]), CodecErrorKind::Hash),
            (format!("{}-abc", HASH.to_uppercase()), CodecErrorKind::Hash),
            ("scratch.txt".to_string(), CodecErrorKind::Hash),
        ];

        for (name, expected) in cases {
            let err = FileName::parse(&name).unwrap_err();
            assert_eq!(err.kind(), expected, "unexpected error kind for {name:?}");
            assert_eq!(err.input(), name);
        }
    }

    #[test]
    fn test_size_overflow_is_rejected() {
        let name = format!("{HASH}-99999999999999999999999-abc");
        assert_eq!(
            FileName::parse(&name).unwrap_err().kind(),
            CodecErrorKind::Size
        );
    }

    #[test]
    fn test_encode_cas_includes_size_and_marker() {
        let hash = ContentHash::parse(HASH).unwrap();
        let encoded = FileName::encode(EntryKind::Cas, &hash, &record(42, 30, true, "tok"));
        assert_eq!(encoded, format!("{HASH}-42-tok.v1"));

        let decoded = FileName::parse(&encoded).unwrap();
        assert_eq!(decoded.logical_size, Some(42));
        assert!(decoded.legacy);
    }

    #[test]
    fn test_encode_omits_size_for_ac_and_raw() {
        let hash = ContentHash::parse(HASH).unwrap();
        for kind in [EntryKind::Ac, EntryKind::Raw] {
            let encoded = FileName::encode(kind, &hash, &record(42, 42, false, "tok"));
            assert_eq!(encoded, format!("{HASH}-tok"));
        }
    }

    #[test]
    fn test_encode_preserves_unsized_cas_names() {
        let hash = ContentHash::parse(HASH).unwrap();
        let name = format!("{HASH}-556677.v1");
        let record = Record::from_file_name(&FileName::parse(&name).unwrap(), 10);
        assert_eq!(FileName::encode(EntryKind::Cas, &hash, &record), name);
    }

    #[test]
    fn test_relative_path_is_sharded() {
        let key = Key::parse(EntryKind::Cas, HASH).unwrap();
        let path = relative_path(&key, &record(5, 3, false, "r4nd0m"));
        assert_eq!(path, PathBuf::from(format!("cas.v2/4f/{HASH}-5-r4nd0m")));
    }

    #[test]
    fn test_generated_tokens_are_valid() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(is_valid_token(&token));
    }
}
