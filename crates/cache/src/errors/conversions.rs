//! Error conversion utilities

use super::types::{CacheError, RecoveryHint};
use crate::codec::CodecError;

impl From<CodecError> for CacheError {
    fn from(error: CodecError) -> Self {
        Self::InvalidKey {
            key: error.input().to_string(),
            reason: error.to_string(),
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskJoin {
            operation: "blocking startup",
            reason: error.to_string(),
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Configuration {
            message: format!("invalid configuration file: {error}"),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }
}
