//! Advisory locks on document sentinels
//!
//! Every document `<path>` has a zero-length sentinel `<path>.lock` that
//! exists only to carry an OS advisory lock (`flock` on Unix). The sentinel
//! is never deleted: a crashed holder releases the OS lock on exit and the
//! leftover file is inert.
//!
//! Acquisition polls `try_lock_*` with a short exponential backoff until a
//! deadline, so a stuck writer surfaces as [`BoardError::LockTimeout`]
//! instead of a hang.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use boardkeep_core::{lock_path, BoardError, BoardResult};
use tracing::{debug, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(1);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Shared (many readers) or exclusive (one writer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Overlaps other shared holders, never an exclusive one
    Shared,
    /// Sole holder
    Exclusive,
}

/// A held advisory lock; released on drop
#[derive(Debug)]
pub struct DocumentLock {
    file: File,
    sentinel: PathBuf,
    mode: LockMode,
}

impl DocumentLock {
    /// Acquire the sentinel lock for `path`, waiting at most `timeout`.
    ///
    /// Creates the sentinel if needed. The document's parent directory must
    /// already exist.
    pub fn acquire(path: &Path, mode: LockMode, timeout: Duration) -> BoardResult<Self> {
        let sentinel = lock_path(path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&sentinel)
            .map_err(|e| BoardError::io(&sentinel, e))?;

        let start = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match try_lock(&file, mode) {
                Ok(()) => {
                    if attempts > 1 {
                        debug!(
                            target: "boardkeep::lock",
                            path = ?path,
                            ?mode,
                            attempts,
                            waited_ms = start.elapsed().as_millis() as u64,
                            "Acquired contended lock"
                        );
                    }
                    return Ok(DocumentLock {
                        file,
                        sentinel,
                        mode,
                    });
                }
                Err(e) if is_contended(&e) => {
                    let elapsed = start.elapsed();
                    if elapsed >= timeout {
                        warn!(
                            target: "boardkeep::lock",
                            path = ?path,
                            ?mode,
                            attempts,
                            "Lock acquisition timed out"
                        );
                        return Err(BoardError::LockTimeout {
                            path: path.to_path_buf(),
                            waited: elapsed,
                        });
                    }
                    thread::sleep(backoff.min(timeout - elapsed));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(BoardError::io(&sentinel, e)),
            }
        }
    }

    /// Mode this lock was taken in
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the sentinel file
    pub fn sentinel(&self) -> &Path {
        &self.sentinel
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            debug!(target: "boardkeep::lock", sentinel = ?self.sentinel, error = %e, "Explicit unlock failed");
        }
    }
}

fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
    match mode {
        LockMode::Shared => fs2::FileExt::try_lock_shared(file),
        LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(file),
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == fs2::lock_contended_error().kind() || e.kind() == io::ErrorKind::WouldBlock
}
