//! Snapshot archive writer
//!
//! Creates `backup_YYYYMMDD_HHMMSS.tar.zst` archives of a team directory with
//! atomic write semantics: either a complete, verified archive appears under
//! its final name, or nothing does.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use boardkeep_core::{lock_path, temp_write_name, BoardError, BoardResult, ExclusionSet};
use chrono::{DateTime, Utc};
use tar::{Builder, Header};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::naming::snapshot_file_name;
use super::reader::SnapshotReader;
use crate::file_store::{sync_dir, FileStore};
use crate::fingerprint::{collect_files, TeamFile};

/// Information about a created snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Team the snapshot belongs to
    pub team: String,
    /// Final archive path
    pub path: PathBuf,
    /// UTC instant encoded in the name
    pub timestamp: DateTime<Utc>,
    /// Number of files archived
    pub file_count: usize,
    /// Archive size on disk
    pub size_bytes: u64,
}

/// Writer for snapshot archives
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    compression_level: i32,
    exclusions: ExclusionSet,
    files: FileStore,
}

impl SnapshotWriter {
    /// Create a writer.
    ///
    /// `files` is used to read documents that carry a lock sentinel, so a
    /// snapshot never races an in-flight read-modify-write on them.
    pub fn new(compression_level: i32, exclusions: ExclusionSet, files: FileStore) -> Self {
        SnapshotWriter {
            compression_level,
            exclusions,
            files,
        }
    }

    /// Archive `source_dir` into `dest_dir` as the snapshot for instant `now`.
    ///
    /// The process:
    /// 1. Collect eligible files (same exclusions as fingerprinting)
    /// 2. Stream them into a hidden temporary `.tar.zst`, then fsync
    /// 3. Verify the temporary decompresses and lists every file
    /// 4. Hard-link the temporary to the final name (never replacing an
    ///    existing snapshot), drop the temporary, fsync the directory
    ///
    /// On any failure the temporary is removed and nothing else changes.
    pub fn create_snapshot(
        &self,
        team: &str,
        source_dir: &Path,
        dest_dir: &Path,
        now: DateTime<Utc>,
    ) -> BoardResult<SnapshotInfo> {
        let files = collect_files(source_dir, &self.exclusions)?;
        if files.is_empty() {
            return Err(BoardError::archive(format!(
                "nothing to archive in {}",
                source_dir.display()
            )));
        }

        fs::create_dir_all(dest_dir).map_err(|e| BoardError::io(dest_dir, e))?;
        let name = snapshot_file_name(now);
        let final_path = dest_dir.join(&name);
        // Early exit only; `publish` is what refuses a concurrent winner
        if final_path.exists() {
            return Err(BoardError::archive(format!(
                "snapshot {} already exists",
                final_path.display()
            )));
        }
        let temp_path = dest_dir.join(temp_write_name(&name, &Uuid::new_v4().simple().to_string()));

        let result = self
            .write_archive(&temp_path, &files)
            .and_then(|written| {
                let verify = SnapshotReader::verify(&temp_path)?;
                if verify.entry_count != written {
                    return Err(BoardError::archive(format!(
                        "verification listed {} entries, wrote {}",
                        verify.entry_count, written
                    )));
                }
                Ok(written)
            });

        let file_count = match result {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                warn!(target: "boardkeep::snapshot", team, error = %e, "Snapshot failed, partial archive removed");
                return Err(e);
            }
        };

        publish(&temp_path, &final_path)?;
        if let Err(e) = sync_dir(dest_dir) {
            warn!(target: "boardkeep::snapshot", dir = ?dest_dir, error = %e, "Directory fsync failed");
        }

        let size_bytes = match fs::metadata(&final_path) {
            Ok(m) if m.len() > 0 => m.len(),
            Ok(_) => {
                let _ = fs::remove_file(&final_path);
                return Err(BoardError::archive(format!(
                    "{} is empty after rename",
                    final_path.display()
                )));
            }
            Err(e) => return Err(BoardError::io(&final_path, e)),
        };

        info!(
            target: "boardkeep::snapshot",
            team,
            path = ?final_path,
            files = file_count,
            bytes = size_bytes,
            "Snapshot created"
        );
        Ok(SnapshotInfo {
            team: team.to_string(),
            path: final_path,
            timestamp: now,
            file_count,
            size_bytes,
        })
    }

    /// Stream files into a compressed tar at `path`; returns entries written
    fn write_archive(&self, path: &Path, files: &[TeamFile]) -> BoardResult<usize> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| BoardError::io(path, e))?;
        let mut encoder = zstd::Encoder::new(BufWriter::new(file), self.compression_level)
            .map_err(|e| BoardError::compression(format!("zstd encoder: {}", e)))?;
        encoder
            .include_checksum(true)
            .map_err(|e| BoardError::compression(format!("zstd checksum: {}", e)))?;

        let mut builder = Builder::new(encoder);
        let mut written = 0usize;
        for entry in files {
            let Some(data) = self.read_source(&entry.path)? else {
                debug!(target: "boardkeep::snapshot", path = ?entry.path, "File vanished before archiving");
                continue;
            };
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(file_mode(&entry.path));
            header.set_mtime(file_mtime(&entry.path));
            builder
                .append_data(&mut header, &entry.relative, data.as_slice())
                .map_err(|e| BoardError::archive(format!("append '{}': {}", entry.relative, e)))?;
            written += 1;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| BoardError::archive(format!("tar finish: {}", e)))?;
        let buf = encoder
            .finish()
            .map_err(|e| BoardError::compression(format!("zstd finish: {}", e)))?;
        let file = buf
            .into_inner()
            .map_err(|e| BoardError::io(path, e.into_error()))?;
        file.sync_all().map_err(|e| BoardError::io(path, e))?;
        Ok(written)
    }

    /// Read a source file, under its shared lock if it has a sentinel
    fn read_source(&self, path: &Path) -> BoardResult<Option<Vec<u8>>> {
        if lock_path(path).exists() {
            return self.files.read_shared(path);
        }
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BoardError::io(path, e)),
        }
    }
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o7777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o644
}

fn file_mtime(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Give the finished temporary its final name without ever replacing an
/// existing snapshot, then remove the temporary.
///
/// `hard_link` fails with `AlreadyExists` atomically, so two writers racing
/// for the same second cannot both publish.
fn publish(temp_path: &Path, final_path: &Path) -> BoardResult<()> {
    let linked = fs::hard_link(temp_path, final_path);
    if let Err(e) = fs::remove_file(temp_path) {
        warn!(target: "boardkeep::snapshot", path = ?temp_path, error = %e, "Failed to remove snapshot temporary");
    }
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(BoardError::archive(format!(
            "snapshot {} already exists",
            final_path.display()
        ))),
        Err(e) => Err(BoardError::io(final_path, e)),
    }
}
