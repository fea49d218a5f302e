//! Persisted backup status
//!
//! One JSON document (`backup-status.json` under the backup root) that
//! external consumers read to learn how the last pass went. Every change
//! goes through [`FileStore::update_json`] so concurrent passes and readers
//! never see a torn document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use boardkeep_core::BoardResult;
use boardkeep_durability::{FileStore, UpdateOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last thing a pass (or an operator) did to a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupAction {
    /// Nothing changed and a recent snapshot exists
    #[serde(rename = "skipped")]
    Skipped,
    /// A new snapshot was taken
    #[serde(rename = "backed_up")]
    BackedUp,
    /// A corrupt board was restored automatically
    #[serde(rename = "auto-restore")]
    AutoRestore,
    /// An operator restored the team
    #[serde(rename = "restored")]
    Restored,
    /// The team could not be processed
    #[serde(rename = "error")]
    Error,
}

impl BackupAction {
    /// Wire name, as stored in the status document
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupAction::Skipped => "skipped",
            BackupAction::BackedUp => "backed_up",
            BackupAction::AutoRestore => "auto-restore",
            BackupAction::Restored => "restored",
            BackupAction::Error => "error",
        }
    }
}

impl fmt::Display for BackupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a team outcome or a whole pass; ordered from best to worst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Everything succeeded
    #[default]
    Ok,
    /// At least one team failed but can be retried
    Error,
    /// At least one team is corrupt with no usable snapshot
    Critical,
}

impl OverallStatus {
    /// The worse of two statuses
    pub fn worst(self, other: OverallStatus) -> OverallStatus {
        self.max(other)
    }

    /// Process exit code for a pass with this status
    pub fn exit_code(&self) -> i32 {
        match self {
            OverallStatus::Ok => 0,
            OverallStatus::Error => 1,
            OverallStatus::Critical => 2,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Error => "error",
            OverallStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-team section of the status document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStatus {
    /// Last time a snapshot was successfully taken
    pub last_backup: Option<DateTime<Utc>>,
    /// Last time the team was examined
    pub last_check: Option<DateTime<Utc>>,
    /// What happened on that examination
    pub last_action: Option<BackupAction>,
    /// Human-readable detail
    pub last_message: Option<String>,
    /// Newest snapshot on disk after the examination
    pub latest_snapshot: Option<PathBuf>,
}

/// The whole status document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupStatus {
    /// When the last full pass finished
    pub last_run: Option<DateTime<Utc>>,
    /// Worst outcome of the last full pass
    pub overall_status: OverallStatus,
    /// Snapshots on disk across all teams
    pub total_snapshots: u64,
    /// Bytes of snapshots on disk across all teams
    pub total_bytes: u64,
    /// Per-team sections, keyed by team id
    pub teams: BTreeMap<String, TeamStatus>,
}

/// Aggregate figures written by [`StatusReporter::finalize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Worst team outcome
    pub overall_status: OverallStatus,
    /// Snapshots on disk
    pub total_snapshots: u64,
    /// Bytes on disk
    pub total_bytes: u64,
}

/// One team outcome to record
#[derive(Debug, Clone)]
pub struct StatusRecord<'a> {
    /// Team id
    pub team: &'a str,
    /// What happened
    pub action: BackupAction,
    /// Detail for operators
    pub message: &'a str,
    /// Newest snapshot after the action, if any
    pub latest_snapshot: Option<&'a Path>,
}

/// Reads and updates the status document
#[derive(Debug, Clone)]
pub struct StatusReporter {
    path: PathBuf,
    files: FileStore,
}

impl StatusReporter {
    /// Reporter for the document at `path`
    pub fn new(path: impl Into<PathBuf>, files: FileStore) -> Self {
        StatusReporter {
            path: path.into(),
            files,
        }
    }

    /// Status document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one team outcome observed at `now`.
    ///
    /// `last_backup` only moves forward on [`BackupAction::BackedUp`];
    /// `latest_snapshot` is kept when the record carries none.
    pub fn record(&self, record: &StatusRecord<'_>, now: DateTime<Utc>) -> BoardResult<UpdateOutcome> {
        self.files.update_json(&self.path, |current: Option<BackupStatus>| {
            let mut status = current.unwrap_or_default();
            let team = status.teams.entry(record.team.to_string()).or_default();
            team.last_check = Some(now);
            team.last_action = Some(record.action);
            team.last_message = Some(record.message.to_string());
            if record.action == BackupAction::BackedUp {
                team.last_backup = Some(now);
            }
            if let Some(latest) = record.latest_snapshot {
                team.latest_snapshot = Some(latest.to_path_buf());
            }
            Ok(Some(status))
        })
    }

    /// Write the aggregate figures of a pass that finished at `now`
    pub fn finalize(&self, stats: &AggregateStats, now: DateTime<Utc>) -> BoardResult<UpdateOutcome> {
        self.files.update_json(&self.path, |current: Option<BackupStatus>| {
            let mut status = current.unwrap_or_default();
            status.last_run = Some(now);
            status.overall_status = stats.overall_status;
            status.total_snapshots = stats.total_snapshots;
            status.total_bytes = stats.total_bytes;
            Ok(Some(status))
        })
    }

    /// Current document; empty if none has been written yet
    pub fn load(&self) -> BoardResult<BackupStatus> {
        Ok(self.files.read_json(&self.path)?.unwrap_or_default())
    }
}
