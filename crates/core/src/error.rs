//! Error types for board storage
//!
//! Every fallible operation in the workspace returns [`BoardError`]. Callers
//! match on the variant to decide whether to propagate, retry, or convert the
//! failure into a per-team outcome. We use `thiserror` for the `Display` and
//! `Error` implementations.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for board operations
pub type BoardResult<T> = std::result::Result<T, BoardError>;

/// Error types for board storage, snapshots and restore
#[derive(Debug, Error)]
pub enum BoardError {
    /// I/O error on a specific path (disk full, permission denied, ...)
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation was touching
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The advisory lock could not be acquired before the deadline
    #[error("Timed out after {waited:?} waiting for lock on {}", path.display())]
    LockTimeout {
        /// Document whose sentinel was contended
        path: PathBuf,
        /// How long we waited
        waited: Duration,
    },

    /// Document content is not well-formed
    #[error("Invalid document {}: {reason}", path.display())]
    InvalidDocument {
        /// Offending document
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Archive could not be built, listed, or extracted
    #[error("Archive error: {0}")]
    Archive(String),

    /// Compression/decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Team id is not usable as a directory/file name
    #[error("Invalid team id '{0}': expected [A-Za-z0-9_-]+")]
    InvalidTeam(String),

    /// Team id is not present in the configured team map
    #[error("Team not found: {0}")]
    TeamNotFound(String),

    /// No snapshot for the team passed structural validation
    #[error("No valid snapshot available for team '{team}' ({checked} checked)")]
    NoValidSnapshot {
        /// Team that could not be restored
        team: String,
        /// Number of snapshots examined
        checked: usize,
    },

    /// A named snapshot does not exist
    #[error("Snapshot not found: {}", .0.display())]
    SnapshotNotFound(PathBuf),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoardError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a compression error
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid document error
    pub fn invalid_document(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True if the failure was lock contention rather than an I/O fault
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// True if the failure indicates damaged content (document or archive)
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidDocument { .. } | Self::Archive(_) | Self::Compression(_) | Self::Json(_)
        )
    }
}
