//! Display implementations for cache errors

use super::types::CacheError;
use std::fmt;

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
                ..
            } => write!(
                f,
                "I/O error during {} on '{}': {}",
                operation,
                path.display(),
                source
            ),
            Self::InvalidLayout { path, reason, .. } => write!(
                f,
                "Unexpected entry in cache directory '{}': {reason}",
                path.display()
            ),
            Self::UnrecognizedFile { path, reason, .. } => {
                write!(f, "Unrecognized file '{}': {reason}", path.display())
            }
            Self::InvalidKey { key, reason, .. } => {
                write!(f, "Invalid cache key '{key}': {reason}")
            }
            Self::Migration {
                path,
                reason,
                source,
                ..
            } => match source {
                Some(source) => write!(
                    f,
                    "Migration of '{}' failed: {reason}: {source}",
                    path.display()
                ),
                None => write!(f, "Migration of '{}' failed: {reason}", path.display()),
            },
            Self::Configuration { message, .. } => {
                write!(f, "Cache configuration error: {message}")
            }
            Self::Startup { stage, source, .. } => {
                write!(f, "Cache startup failed to {}: {source}", stage.as_str())
            }
            Self::TaskJoin {
                operation, reason, ..
            } => write!(f, "Background task for {operation} failed: {reason}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Migration {
                source: Some(source),
                ..
            } => Some(source),
            Self::Startup { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
