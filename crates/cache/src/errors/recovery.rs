//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::InvalidLayout { recovery_hint, .. }
            | Self::UnrecognizedFile { recovery_hint, .. }
            | Self::InvalidKey { recovery_hint, .. }
            | Self::Migration { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. }
            | Self::Startup { recovery_hint, .. }
            | Self::TaskJoin { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry)
    }

    /// Check if this error means the cache directory holds foreign or
    /// corrupted content
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::InvalidLayout { .. } | Self::UnrecognizedFile { .. } => true,
            Self::Startup { source, .. } => source.is_corruption(),
            _ => false,
        }
    }
}
