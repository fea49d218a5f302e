//! Listing snapshots in a team's backup directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use boardkeep_core::{BoardError, BoardResult};
use chrono::{DateTime, Utc};

use super::naming::parse_snapshot_name;

/// A snapshot found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Archive path
    pub path: PathBuf,
    /// UTC instant encoded in the name
    pub timestamp: DateTime<Utc>,
    /// Archive size
    pub size_bytes: u64,
}

impl SnapshotEntry {
    /// Archive file name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// All snapshots in `dir`, oldest first.
///
/// Files whose names do not parse as snapshot names (temporaries, the
/// quarantine directory, anything foreign) are ignored. A missing directory
/// has no snapshots.
pub fn list_snapshots(dir: &Path) -> BoardResult<Vec<SnapshotEntry>> {
    let read = match fs::read_dir(dir) {
        Ok(r) => r,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(BoardError::io(dir, e)),
    };

    let mut out = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| BoardError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(timestamp) = parse_snapshot_name(&name) else {
            continue;
        };
        let meta = match entry.metadata() {
            Ok(m) => m,
            // Pruned by someone else mid-listing
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BoardError::io(entry.path(), e)),
        };
        if !meta.is_file() {
            continue;
        }
        out.push(SnapshotEntry {
            path: entry.path(),
            timestamp,
            size_bytes: meta.len(),
        });
    }
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(out)
}

/// Newest snapshot in `dir`, if any
pub fn latest_snapshot(dir: &Path) -> BoardResult<Option<SnapshotEntry>> {
    Ok(list_snapshots(dir)?.pop())
}

/// Look up a snapshot by file name
pub fn find_snapshot(dir: &Path, name: &str) -> BoardResult<SnapshotEntry> {
    list_snapshots(dir)?
        .into_iter()
        .find(|e| e.file_name() == name)
        .ok_or_else(|| BoardError::SnapshotNotFound(dir.join(name)))
}
