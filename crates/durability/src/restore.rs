//! Restoring a team's board directory from a snapshot
//!
//! Candidates are examined newest-first. A snapshot is usable when it passes
//! [`SnapshotReader::verify`] and holds the team's board document as
//! non-empty, parseable JSON; anything else is skipped and the next older
//! snapshot is tried.
//!
//! Restore overlays the archive onto the live directory: every archived file
//! is written back through [`FileStore::update_exclusive`], the board
//! document last, and live files the snapshot does not contain are left in
//! place. If the live board holds bytes the snapshot would replace, they are
//! first copied into the team's quarantine directory.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use boardkeep_core::{board_file_name, BoardError, BoardResult, TeamPaths};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::file_store::{sync_dir, FileStore, Update, UpdateOutcome};
use crate::health::DocumentHealth;
use crate::snapshot::{list_snapshots, SnapshotEntry, SnapshotReader};

const QUARANTINE_STAMP: &str = "%Y%m%d_%H%M%S";
const QUARANTINE_TOKEN_LEN: usize = 8;

/// A snapshot passed over during candidate search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSnapshot {
    /// Archive path
    pub path: PathBuf,
    /// Why it was rejected
    pub reason: String,
}

/// Result of restoring a team
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Team restored
    pub team: String,
    /// Snapshot the files came from
    pub snapshot: SnapshotEntry,
    /// Files written back (unchanged files are not counted)
    pub files_restored: usize,
    /// Newer snapshots rejected before this one was chosen
    pub skipped: Vec<SkippedSnapshot>,
    /// Where the replaced board bytes were preserved, if any
    pub quarantined: Option<PathBuf>,
}

/// Check that the snapshot at `path` can restore a team whose board
/// document is named `board_name`
pub fn snapshot_is_restorable(path: &Path, board_name: &str) -> BoardResult<()> {
    SnapshotReader::verify(path)?;
    let Some(board) = SnapshotReader::read_entry(path, board_name)? else {
        return Err(BoardError::archive(format!(
            "{} does not contain {}",
            path.display(),
            board_name
        )));
    };
    match DocumentHealth::classify_bytes(&board).into_error(Path::new(board_name)) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Newest restorable snapshot for the team, with the newer ones skipped on
/// the way.
///
/// Returns [`BoardError::NoValidSnapshot`] if none qualifies.
pub fn find_restorable(paths: &TeamPaths) -> BoardResult<(SnapshotEntry, Vec<SkippedSnapshot>)> {
    let board_name = board_file_name(paths.team());
    let candidates = list_snapshots(paths.backup_dir())?;
    let checked = candidates.len();
    let mut skipped = Vec::new();

    for entry in candidates.into_iter().rev() {
        match snapshot_is_restorable(&entry.path, &board_name) {
            Ok(()) => return Ok((entry, skipped)),
            Err(e) => {
                warn!(
                    target: "boardkeep::restore",
                    team = %paths.team(),
                    snapshot = %entry.file_name(),
                    error = %e,
                    "Skipping unusable snapshot"
                );
                skipped.push(SkippedSnapshot {
                    path: entry.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(BoardError::NoValidSnapshot {
        team: paths.team().to_string(),
        checked,
    })
}

/// Writes snapshots back over live board directories
#[derive(Debug, Clone)]
pub struct Restorer {
    files: FileStore,
}

impl Restorer {
    /// Create a restorer that writes through `files`
    pub fn new(files: FileStore) -> Self {
        Restorer { files }
    }

    /// Restore `paths` from `snapshot`, or from the newest restorable one
    /// when `snapshot` is `None`.
    ///
    /// An explicitly named snapshot must itself be restorable; no fallback
    /// to older snapshots happens in that case.
    pub fn restore_team(
        &self,
        paths: &TeamPaths,
        snapshot: Option<&SnapshotEntry>,
        now: DateTime<Utc>,
    ) -> BoardResult<RestoreReport> {
        let board_name = board_file_name(paths.team());
        let (entry, skipped) = match snapshot {
            Some(entry) => {
                snapshot_is_restorable(&entry.path, &board_name)?;
                (entry.clone(), Vec::new())
            }
            None => find_restorable(paths)?,
        };

        let mut contents = SnapshotReader::read_all(&entry.path)?;
        let board_bytes = contents
            .remove(&board_name)
            .ok_or_else(|| BoardError::archive(format!("{} vanished from archive", board_name)))?;

        let mut files_restored = 0usize;
        for (relative, bytes) in contents {
            if self.write_back(&paths.team_root().join(&relative), bytes)? {
                files_restored += 1;
            }
        }

        let board_path = paths.board();
        let quarantine_path = paths
            .quarantine_dir()
            .join(quarantine_name(&board_name, now));
        let mut quarantined = None;
        let outcome = self.files.update_exclusive(&board_path, |current| {
            match current {
                Some(live) if live == board_bytes.as_slice() => return Ok(Update::NoChange),
                Some(live) if !live.is_empty() => {
                    quarantine(&quarantine_path, live)?;
                    quarantined = Some(quarantine_path.clone());
                }
                _ => {}
            }
            Ok(Update::Write(board_bytes))
        })?;
        if outcome == UpdateOutcome::Written {
            files_restored += 1;
        }

        info!(
            target: "boardkeep::restore",
            team = %paths.team(),
            snapshot = %entry.file_name(),
            files = files_restored,
            skipped = skipped.len(),
            quarantined = quarantined.is_some(),
            "Team restored"
        );
        Ok(RestoreReport {
            team: paths.team().to_string(),
            snapshot: entry,
            files_restored,
            skipped,
            quarantined,
        })
    }

    /// Replace one file under its lock; false if it already matched
    fn write_back(&self, path: &Path, bytes: Vec<u8>) -> BoardResult<bool> {
        let outcome = self.files.update_exclusive(path, |current| {
            if current == Some(bytes.as_slice()) {
                Ok(Update::NoChange)
            } else {
                Ok(Update::Write(bytes))
            }
        })?;
        Ok(outcome == UpdateOutcome::Written)
    }
}

/// Extract every file of the snapshot at `path` into `dest`.
///
/// Used for inspecting old snapshots; `dest` is created if needed and
/// existing files there are overwritten without locking. Returns the number
/// of files written.
pub fn restore_snapshot_to(path: &Path, dest: &Path) -> BoardResult<usize> {
    let contents = SnapshotReader::read_all(path)?;
    fs::create_dir_all(dest).map_err(|e| BoardError::io(dest, e))?;
    let count = contents.len();
    for (relative, bytes) in contents {
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BoardError::io(parent, e))?;
        }
        fs::write(&target, bytes).map_err(|e| BoardError::io(&target, e))?;
    }
    info!(target: "boardkeep::restore", snapshot = ?path, dest = ?dest, files = count, "Snapshot extracted");
    Ok(count)
}

/// `<board>.<YYYYMMDD_HHMMSS>.<token>`; the token keeps same-second
/// restores apart
fn quarantine_name(board_name: &str, now: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}.{}.{}",
        board_name,
        now.format(QUARANTINE_STAMP),
        &token[..QUARANTINE_TOKEN_LEN]
    )
}

fn quarantine(target: &Path, bytes: &[u8]) -> BoardResult<()> {
    let dir = target
        .parent()
        .ok_or_else(|| BoardError::archive("quarantine path has no parent"))?;
    fs::create_dir_all(dir).map_err(|e| BoardError::io(dir, e))?;
    // Never replace an earlier quarantined copy
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|e| BoardError::io(target, e))?;
    file.write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| BoardError::io(target, e))?;
    if let Err(e) = sync_dir(dir) {
        warn!(target: "boardkeep::restore", dir = ?dir, error = %e, "Directory fsync failed");
    }
    info!(target: "boardkeep::restore", path = ?target, bytes = bytes.len(), "Board quarantined");
    Ok(())
}
