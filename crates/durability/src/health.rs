//! Board document health checks
//!
//! A board is healthy when it exists, is non-empty and parses as JSON. A
//! missing board is not corruption; the team simply has no board yet.

use std::fmt;
use std::path::Path;

use boardkeep_core::{BoardError, BoardResult};

use crate::file_store::FileStore;

/// Classification of a board document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentHealth {
    /// No file at the path
    Missing,
    /// Zero bytes (or only whitespace)
    Empty,
    /// Present but not parseable; holds the parser message
    Invalid(String),
    /// Present and parses as JSON
    Valid,
}

impl DocumentHealth {
    /// Classify raw document bytes
    pub fn classify_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return DocumentHealth::Empty;
        }
        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(_) => DocumentHealth::Valid,
            Err(e) => DocumentHealth::Invalid(e.to_string()),
        }
    }

    /// Empty or invalid; these trigger auto-restore
    pub fn is_corrupt(&self) -> bool {
        matches!(self, DocumentHealth::Empty | DocumentHealth::Invalid(_))
    }

    /// Short label for logs and status messages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentHealth::Missing => "missing",
            DocumentHealth::Empty => "empty",
            DocumentHealth::Invalid(_) => "invalid",
            DocumentHealth::Valid => "valid",
        }
    }

    /// Convert a corrupt classification into an error for `path`
    pub fn into_error(self, path: &Path) -> Option<BoardError> {
        match self {
            DocumentHealth::Empty => Some(BoardError::invalid_document(path, "document is empty")),
            DocumentHealth::Invalid(reason) => Some(BoardError::invalid_document(path, reason)),
            DocumentHealth::Missing | DocumentHealth::Valid => None,
        }
    }
}

impl fmt::Display for DocumentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentHealth::Invalid(reason) => write!(f, "invalid ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Check the document at `path`, reading it under its shared lock
pub fn check_document(files: &FileStore, path: &Path) -> BoardResult<DocumentHealth> {
    Ok(match files.read_shared(path)? {
        None => DocumentHealth::Missing,
        Some(bytes) => DocumentHealth::classify_bytes(&bytes),
    })
}
