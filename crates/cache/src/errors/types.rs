//! Core error types for the disk cache

use std::path::PathBuf;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Re-export CacheError as Error for convenience
pub use CacheError as Error;

/// Error type for disk cache operations
#[derive(Debug)]
pub enum CacheError {
    /// I/O errors during cache operations
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
        recovery_hint: RecoveryHint,
    },

    /// The cache directory contains entries that do not belong to the layout
    InvalidLayout {
        path: PathBuf,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// A file inside the current layout could not be decoded
    UnrecognizedFile {
        path: PathBuf,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Invalid cache key or record field
    InvalidKey {
        key: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Legacy layout upgrade failed
    Migration {
        path: PathBuf,
        reason: String,
        source: Option<std::io::Error>,
        recovery_hint: RecoveryHint,
    },

    /// Configuration error
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },

    /// A startup stage failed; the cache is unusable
    Startup {
        stage: StartupStage,
        source: Box<CacheError>,
        recovery_hint: RecoveryHint,
    },

    /// A background task panicked or was cancelled
    TaskJoin {
        operation: &'static str,
        reason: String,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry,

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// The directory is not a cache root, or it has been tampered with
    VerifyCacheDirectory { path: PathBuf },

    /// Remove the offending file by hand and restart
    RemoveFile { path: PathBuf },

    /// Update cache configuration
    UpdateConfiguration,

    /// No automated recovery possible
    Manual { instructions: String },

    /// No recovery possible
    NoRecovery,
}

/// Stages of the startup sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    CreateDirectories,
    Migration,
    Scan,
    BuildIndex,
}

impl StartupStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateDirectories => "create directories",
            Self::Migration => "migrate legacy layout",
            Self::Scan => "scan cache directory",
            Self::BuildIndex => "build index",
        }
    }
}

impl CacheError {
    /// I/O error with the path and operation that failed
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        let recovery_hint = match source.kind() {
            std::io::ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
                path: path.clone(),
            },
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut => RecoveryHint::Retry,
            _ => RecoveryHint::NoRecovery,
        };
        Self::Io {
            path,
            operation,
            source,
            recovery_hint,
        }
    }

    pub fn invalid_layout(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self::InvalidLayout {
            recovery_hint: RecoveryHint::VerifyCacheDirectory { path: path.clone() },
            path,
            reason: reason.into(),
        }
    }

    pub fn unrecognized_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self::UnrecognizedFile {
            recovery_hint: RecoveryHint::RemoveFile { path: path.clone() },
            path,
            reason: reason.into(),
        }
    }

    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    pub fn migration(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Migration {
            path: path.into(),
            reason: reason.into(),
            source: None,
            recovery_hint: RecoveryHint::Manual {
                instructions: "Move or delete the legacy cache directory and restart".to_string(),
            },
        }
    }

    pub fn migration_io(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        let path = path.into();
        Self::Migration {
            recovery_hint: RecoveryHint::CheckPermissions { path: path.clone() },
            path,
            reason: reason.into(),
            source: Some(source),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }

    pub fn startup(stage: StartupStage, source: CacheError) -> Self {
        let recovery_hint = source.recovery_hint().clone();
        Self::Startup {
            stage,
            source: Box::new(source),
            recovery_hint,
        }
    }
}
