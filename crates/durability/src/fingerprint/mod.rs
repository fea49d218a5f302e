//! Directory fingerprints and the snapshot decision
//!
//! A fingerprint is a SHA-256 digest folded over every non-transient file
//! under a team directory, in sorted relative-path order. Each file
//! contributes its length-prefixed relative path followed by its
//! length-prefixed content, so renames, moves and edits all change the
//! digest and no two distinct file sets can collide by concatenation.

mod store;

pub use store::{FingerprintRecord, FingerprintStore};

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use boardkeep_core::{BoardError, BoardResult, ExclusionSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Hex-encoded SHA-256 digest of a directory's contents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an existing hex digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Fingerprint(hex.into())
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One regular file under a team directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamFile {
    /// `/`-separated path relative to the team root
    pub relative: String,
    /// Absolute path
    pub path: PathBuf,
}

/// Enumerate non-excluded regular files under `root`, sorted by relative path.
///
/// Symlinks and other special files are skipped. A missing root yields an
/// empty list.
pub fn collect_files(root: &Path, exclusions: &ExclusionSet) -> BoardResult<Vec<TeamFile>> {
    let mut out = Vec::new();
    if !root.is_dir() {
        return Ok(out);
    }
    walk(root, "", exclusions, &mut out)?;
    out.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(out)
}

fn walk(
    dir: &Path,
    prefix: &str,
    exclusions: &ExclusionSet,
    out: &mut Vec<TeamFile>,
) -> BoardResult<()> {
    let read = fs::read_dir(dir).map_err(|e| BoardError::io(dir, e))?;
    for entry in read {
        let entry = entry.map_err(|e| BoardError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BoardError::io(entry.path(), e)),
        };
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        if file_type.is_dir() {
            walk(&entry.path(), &relative, exclusions, out)?;
        } else if file_type.is_file() && !exclusions.is_excluded(&name) {
            out.push(TeamFile {
                relative,
                path: entry.path(),
            });
        }
    }
    Ok(())
}

/// Fingerprint a team directory.
///
/// Returns `Ok(None)` if the directory is absent or holds no eligible files.
pub fn fingerprint(root: &Path, exclusions: &ExclusionSet) -> BoardResult<Option<Fingerprint>> {
    let files = collect_files(root, exclusions)?;
    let mut hasher = Sha256::new();
    let mut hashed = 0usize;

    for file in &files {
        let content = match fs::read(&file.path) {
            Ok(c) => c,
            // Deleted between listing and reading
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BoardError::io(&file.path, e)),
        };
        hasher.update((file.relative.len() as u64).to_le_bytes());
        hasher.update(file.relative.as_bytes());
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
        hashed += 1;
    }

    if hashed == 0 {
        return Ok(None);
    }
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    debug!(target: "boardkeep::fingerprint", root = ?root, files = hashed, fingerprint = %hex, "Computed fingerprint");
    Ok(Some(Fingerprint(hex)))
}

/// What the fingerprint store knew about a team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredFingerprint<'a> {
    /// A previous fingerprint was recorded
    Known(&'a Fingerprint),
    /// Nothing recorded yet
    Absent,
    /// The store could not be read
    Unreadable,
}

/// Why a snapshot is being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    /// Content differs from the recorded fingerprint
    Changed,
    /// No fingerprint recorded for this team yet
    FirstBackup,
    /// Content unchanged but the latest snapshot is older than the floor
    FloorElapsed,
    /// The fingerprint store was unreadable
    StoreUnreadable,
}

impl SnapshotReason {
    /// Short human-readable description
    pub fn describe(&self) -> &'static str {
        match self {
            SnapshotReason::Changed => "content changed",
            SnapshotReason::FirstBackup => "first backup",
            SnapshotReason::FloorElapsed => "no recent snapshot",
            SnapshotReason::StoreUnreadable => "fingerprint store unreadable",
        }
    }
}

/// Outcome of [`decide_snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// Take a snapshot now
    Take(SnapshotReason),
    /// Nothing to do
    Skip,
}

/// Decide whether a team needs a snapshot.
///
/// A snapshot is due when the content changed, or when the newest snapshot
/// is older than `floor` (or there is none). An unreadable store always
/// yields a snapshot.
pub fn decide_snapshot(
    current: &Fingerprint,
    stored: StoredFingerprint<'_>,
    latest_snapshot: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    floor: Duration,
) -> SnapshotDecision {
    match stored {
        StoredFingerprint::Unreadable => {
            return SnapshotDecision::Take(SnapshotReason::StoreUnreadable)
        }
        StoredFingerprint::Absent => return SnapshotDecision::Take(SnapshotReason::FirstBackup),
        StoredFingerprint::Known(previous) if previous != current => {
            return SnapshotDecision::Take(SnapshotReason::Changed)
        }
        StoredFingerprint::Known(_) => {}
    }

    let floor = chrono::Duration::from_std(floor).unwrap_or_else(|_| chrono::Duration::hours(24));
    match latest_snapshot {
        Some(at) if now.signed_duration_since(at) < floor => SnapshotDecision::Skip,
        _ => SnapshotDecision::Take(SnapshotReason::FloorElapsed),
    }
}
