//! Transient-file exclusion rules
//!
//! Lock sentinels, debug logs, OS metadata, and in-flight atomic-write
//! temporaries never take part in fingerprinting or snapshots. The same
//! [`ExclusionSet`] is consulted by both so a file is either hashed *and*
//! archived, or neither.

use serde::{Deserialize, Serialize};

/// Suffix used by the atomic writer for its temporaries (`.<name>.<uuid>.tmp`).
pub const TEMP_WRITE_SUFFIX: &str = ".tmp";

/// Length of the simple (hyphenless) uuid token inside a temporary's name
pub const TEMP_WRITE_TOKEN_LEN: usize = 32;

/// Exclusion configuration (`[exclusions]` in `boardkeep.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionSet {
    /// Exact file names to skip
    #[serde(default = "default_names")]
    pub names: Vec<String>,
    /// File name suffixes to skip (e.g. `-debug.log`)
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    /// File extensions to skip, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_names() -> Vec<String> {
    vec![".DS_Store".to_string()]
}

fn default_suffixes() -> Vec<String> {
    vec!["-debug.log".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["lock".to_string()]
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self {
            names: default_names(),
            suffixes: default_suffixes(),
            extensions: default_extensions(),
        }
    }
}

impl ExclusionSet {
    /// Whether a file with this name is transient and must be skipped
    pub fn is_excluded(&self, file_name: &str) -> bool {
        if is_temp_write(file_name) {
            return true;
        }
        if self.names.iter().any(|n| n == file_name) {
            return true;
        }
        if self.suffixes.iter().any(|s| file_name.ends_with(s.as_str())) {
            return true;
        }
        match file_name.rsplit_once('.') {
            // A leading dot alone is a hidden name, not an extension.
            Some((stem, ext)) if !stem.is_empty() => self.extensions.iter().any(|e| e == ext),
            _ => false,
        }
    }
}

/// Name of the temporary that replaces `file_name`; `token` is a simple uuid
pub fn temp_write_name(file_name: &str, token: &str) -> String {
    format!(".{}.{}{}", file_name, token, TEMP_WRITE_SUFFIX)
}

/// Whether `file_name` is an atomic-write temporary.
///
/// Only the exact `.<name>.<32 lowercase hex>.tmp` shape matches. Other
/// hidden `.tmp` files belong to the board and are hashed, archived and
/// never swept.
pub fn is_temp_write(file_name: &str) -> bool {
    let Some(inner) = file_name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(TEMP_WRITE_SUFFIX))
    else {
        return false;
    };
    match inner.rsplit_once('.') {
        Some((name, token)) => {
            !name.is_empty()
                && token.len() == TEMP_WRITE_TOKEN_LEN
                && token
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}
