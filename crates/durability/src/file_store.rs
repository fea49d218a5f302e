//! Lock-protected atomic document I/O
//!
//! [`FileStore`] is the read / read-modify-write primitive every writer of a
//! board document goes through:
//!
//! - [`FileStore::read_shared`] takes the sentinel lock shared and reads the
//!   current bytes.
//! - [`FileStore::update_exclusive`] takes it exclusively, hands the current
//!   bytes to a transform, and if the transform produced new content writes
//!   it with the write-fsync-rename pattern:
//!   1. Write to a temporary file in the same directory (`.<name>.<uuid>.tmp`)
//!   2. fsync the temporary file
//!   3. Atomic rename over the target
//!   4. fsync the parent directory
//!
//! A reader therefore sees either the old document or the new one, never a
//! prefix. On any failure the temporary is removed and the target is left
//! untouched.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use boardkeep_core::{temp_write_name, BoardError, BoardResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::lock::{DocumentLock, LockMode};

/// What a transform wants done with the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Replace the document with these bytes
    Write(Vec<u8>),
    /// Leave the document as it is; nothing is written
    NoChange,
}

/// Result of a successful [`FileStore::update_exclusive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New content was made visible
    Written,
    /// The transform declined to change anything
    Unchanged,
}

/// Injection points for crash testing the write path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Half of the new content reaches the temporary file, then the write fails
    MidTempWrite,
    /// The temporary file is complete and synced, then the rename fails
    BeforeRename,
}

/// Lock-protected atomic reader/writer for documents
#[derive(Debug, Clone)]
pub struct FileStore {
    lock_timeout: Duration,
    crash_point: Option<CrashPoint>,
}

impl FileStore {
    /// Create a store whose lock waits are bounded by `lock_timeout`
    pub fn new(lock_timeout: Duration) -> Self {
        FileStore {
            lock_timeout,
            crash_point: None,
        }
    }

    /// Fail every write at `point` (crash testing only)
    pub fn with_crash_point(mut self, point: CrashPoint) -> Self {
        self.crash_point = Some(point);
        self
    }

    /// Lock acquisition deadline
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Read a document under a shared lock.
    ///
    /// Returns `Ok(None)` if the document (or its directory) does not exist.
    pub fn read_shared(&self, path: &Path) -> BoardResult<Option<Vec<u8>>> {
        if !parent_exists(path) {
            return Ok(None);
        }
        let _lock = DocumentLock::acquire(path, LockMode::Shared, self.lock_timeout)?;
        read_optional(path)
    }

    /// Read-modify-write a document under an exclusive lock.
    ///
    /// `transform` receives the current bytes (or `None` if absent). If it
    /// returns [`Update::NoChange`] nothing is written; if it returns an
    /// error that error is returned and nothing is written. The lock is
    /// released on every path.
    pub fn update_exclusive<F>(&self, path: &Path, transform: F) -> BoardResult<UpdateOutcome>
    where
        F: FnOnce(Option<&[u8]>) -> BoardResult<Update>,
    {
        let parent = parent_dir(path);
        fs::create_dir_all(parent).map_err(|e| BoardError::io(parent, e))?;

        let _lock = DocumentLock::acquire(path, LockMode::Exclusive, self.lock_timeout)?;
        let current = read_optional(path)?;
        match transform(current.as_deref())? {
            Update::NoChange => Ok(UpdateOutcome::Unchanged),
            Update::Write(bytes) => {
                self.write_atomic(path, &bytes)?;
                Ok(UpdateOutcome::Written)
            }
        }
    }

    /// Read and deserialize a JSON document under a shared lock
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> BoardResult<Option<T>> {
        match self.read_shared(path)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Read-modify-write a JSON document under an exclusive lock.
    ///
    /// `f` receives the parsed current value, or `None` if the document is
    /// absent or unparseable (the latter is logged and then overwritten).
    /// Returning `Ok(None)` leaves the document untouched.
    pub fn update_json<T, F>(&self, path: &Path, f: F) -> BoardResult<UpdateOutcome>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> BoardResult<Option<T>>,
    {
        self.update_exclusive(path, |current| {
            let parsed = match current {
                None => None,
                Some(bytes) => match serde_json::from_slice::<T>(bytes) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(
                            target: "boardkeep::store",
                            path = ?path,
                            error = %e,
                            "Unparseable JSON document will be replaced"
                        );
                        None
                    }
                },
            };
            match f(parsed)? {
                None => Ok(Update::NoChange),
                Some(value) => {
                    let mut bytes = serde_json::to_vec_pretty(&value)?;
                    bytes.push(b'\n');
                    Ok(Update::Write(bytes))
                }
            }
        })
    }

    /// Write-fsync-rename. Caller must hold the exclusive lock.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> BoardResult<()> {
        let temp_path = temp_path_for(path);

        if let Err(e) = self.write_temp(path, &temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(BoardError::io(path, e));
        }

        let renamed = match self.crash_point {
            Some(CrashPoint::BeforeRename) => Err(injected("before rename")),
            _ => fs::rename(&temp_path, path),
        };
        if let Err(e) = renamed {
            let _ = fs::remove_file(&temp_path);
            return Err(BoardError::io(path, e));
        }

        // The new content is already visible; a failed directory sync only
        // weakens durability across power loss.
        if let Err(e) = sync_dir(parent_dir(path)) {
            warn!(target: "boardkeep::store", path = ?path, error = %e, "Directory fsync failed");
        }
        debug!(target: "boardkeep::store", path = ?path, bytes = bytes.len(), "Document written");
        Ok(())
    }

    fn write_temp(&self, target: &Path, temp_path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp_path)?;

        if self.crash_point == Some(CrashPoint::MidTempWrite) {
            file.write_all(&bytes[..bytes.len() / 2])?;
            return Err(injected("mid temp write"));
        }

        file.write_all(bytes)?;
        file.flush()?;
        // Keep the target's permission bits across the replace
        if let Ok(meta) = fs::metadata(target) {
            file.set_permissions(meta.permissions())?;
        }
        file.sync_all()
    }
}

/// Temporary sibling used while replacing `path`
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent_dir(path).join(temp_write_name(&name, &Uuid::new_v4().simple().to_string()))
}

fn read_optional(path: &Path) -> BoardResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BoardError::io(path, e)),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn parent_exists(path: &Path) -> bool {
    parent_dir(path).is_dir()
}

fn injected(at: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected crash {}", at))
}

/// fsync a directory so a rename inside it is durable
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
