//! Applying a retention plan to a backup directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use boardkeep_core::{BoardResult, RetentionPolicy};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::plan_retention;
use crate::lock::{DocumentLock, LockMode};
use crate::snapshot::list_snapshots;

/// Result of a prune run
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Snapshots that survive
    pub kept: usize,
    /// Snapshots removed (or that would be removed, on a dry run)
    pub deleted: Vec<PathBuf>,
    /// Bytes reclaimed (or reclaimable)
    pub freed_bytes: u64,
    /// Deletions that failed, with the error
    pub failed: Vec<(PathBuf, String)>,
    /// Nothing was actually deleted
    pub dry_run: bool,
}

impl PruneReport {
    /// Check if anything was (or would be) removed
    pub fn did_prune(&self) -> bool {
        !self.deleted.is_empty()
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "kept={}, deleted={}, freed_bytes={}, failed={}, dry_run={}",
            self.kept,
            self.deleted.len(),
            self.freed_bytes,
            self.failed.len(),
            self.dry_run
        )
    }
}

/// Deletes snapshots that no retention rule claims
#[derive(Debug, Clone)]
pub struct Pruner {
    policy: RetentionPolicy,
    lock_timeout: Duration,
}

impl Pruner {
    /// Create a pruner; `lock_timeout` bounds the wait for the backup
    /// directory lock
    pub fn new(policy: RetentionPolicy, lock_timeout: Duration) -> Self {
        Pruner {
            policy,
            lock_timeout,
        }
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Prune the snapshots in `backup_dir` as of `now`.
    ///
    /// Holds an exclusive lock on the directory (sentinel
    /// `<backup_dir>.lock`) so two pruners never interleave. A failed
    /// deletion is recorded and the rest continue. A snapshot that vanished
    /// before we got to it counts as deleted.
    pub fn prune(
        &self,
        backup_dir: &Path,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> BoardResult<PruneReport> {
        let mut report = PruneReport {
            dry_run,
            ..Default::default()
        };
        if !backup_dir.is_dir() {
            return Ok(report);
        }

        let _lock = DocumentLock::acquire(backup_dir, LockMode::Exclusive, self.lock_timeout)?;
        let entries = list_snapshots(backup_dir)?;
        let plan = plan_retention(&entries, &self.policy, now);
        report.kept = plan.keep.len();

        for kept in &plan.keep {
            debug!(
                target: "boardkeep::retention",
                snapshot = %kept.entry.file_name(),
                reasons = ?kept.reasons,
                "Retained"
            );
        }

        for entry in plan.delete {
            if dry_run {
                report.freed_bytes += entry.size_bytes;
                report.deleted.push(entry.path);
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    report.freed_bytes += entry.size_bytes;
                    report.deleted.push(entry.path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    report.deleted.push(entry.path);
                }
                Err(e) => {
                    warn!(
                        target: "boardkeep::retention",
                        snapshot = ?entry.path,
                        error = %e,
                        "Failed to remove snapshot"
                    );
                    report.failed.push((entry.path, e.to_string()));
                }
            }
        }

        info!(
            target: "boardkeep::retention",
            dir = ?backup_dir,
            kept = report.kept,
            deleted = report.deleted.len(),
            freed_bytes = report.freed_bytes,
            dry_run,
            "Prune completed"
        );
        Ok(report)
    }
}
