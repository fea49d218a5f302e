//! Removal of abandoned atomic-write temporaries
//!
//! A writer killed between creating `.<name>.<uuid>.tmp` and renaming it
//! leaves the temporary behind. Fingerprinting and snapshots already ignore
//! them; this sweep reclaims the space. Only temporaries older than a
//! threshold are touched, since a younger one may belong to a live writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use boardkeep_core::{is_temp_write, BoardError, BoardResult};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Age after which a temporary is considered abandoned
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Remove temporaries under `dir` (recursively) last modified more than
/// `older_than` before `now`. Returns the paths removed.
///
/// A missing directory is not an error. Failures to remove a single file
/// are logged and skipped.
pub fn cleanup_stale_temp_files(
    dir: &Path,
    older_than: Duration,
    now: DateTime<Utc>,
) -> BoardResult<Vec<PathBuf>> {
    let mut removed = Vec::new();
    sweep(dir, older_than, now, &mut removed)?;
    Ok(removed)
}

fn sweep(
    dir: &Path,
    older_than: Duration,
    now: DateTime<Utc>,
    removed: &mut Vec<PathBuf>,
) -> BoardResult<()> {
    let read = match fs::read_dir(dir) {
        Ok(r) => r,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BoardError::io(dir, e)),
    };

    for entry in read {
        let entry = entry.map_err(|e| BoardError::io(dir, e))?;
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BoardError::io(&path, e)),
        };
        if file_type.is_dir() {
            sweep(&path, older_than, now, removed)?;
            continue;
        }
        let name = entry.file_name();
        if !file_type.is_file() || !is_temp_write(&name.to_string_lossy()) {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(e) => {
                debug!(target: "boardkeep::cleanup", path = ?path, error = %e, "Cannot stat temporary");
                continue;
            }
        };
        let age = now.signed_duration_since(modified);
        if age.to_std().map_or(true, |age| age <= older_than) {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(target: "boardkeep::cleanup", path = ?path, "Removed stale temporary");
                removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(target: "boardkeep::cleanup", path = ?path, error = %e, "Failed to remove stale temporary");
            }
        }
    }
    Ok(())
}
