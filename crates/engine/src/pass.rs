//! The backup engine
//!
//! [`BackupEngine`] ties the durability pieces together into the operations
//! an operator or scheduler calls:
//!
//! - [`BackupEngine::run_pass`]: one sequential sweep over every configured
//!   team (check, restore or snapshot, prune, report)
//! - [`BackupEngine::restore_team`]: explicit restore, optionally from a
//!   named snapshot
//! - [`BackupEngine::prune`]: retention only
//! - [`BackupEngine::status`]: the persisted status document
//!
//! # Per-team isolation
//!
//! A failure in one team never stops the sweep. Every team ends up with a
//! [`TeamReport`] and a status record, whatever went wrong.

use std::path::Path;

use boardkeep_core::{BoardError, BoardResult, BoardkeepConfig, TeamPaths};
use boardkeep_durability::{
    check_document, cleanup_stale_temp_files, decide_snapshot, find_snapshot, fingerprint,
    latest_snapshot, list_snapshots, DocumentHealth, FileStore, FingerprintStore, PruneReport,
    Pruner, RestoreReport, Restorer, SnapshotDecision, SnapshotEntry, SnapshotWriter,
    StoredFingerprint, STALE_TEMP_AGE,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::status::{
    AggregateStats, BackupAction, BackupStatus, OverallStatus, StatusRecord, StatusReporter,
};

/// Outcome of one team within a pass
#[derive(Debug, Clone)]
pub struct TeamReport {
    /// Team id
    pub team: String,
    /// What happened
    pub action: BackupAction,
    /// How bad it was
    pub severity: OverallStatus,
    /// Detail for operators
    pub message: String,
    /// Snapshot taken or restored from, if any
    pub snapshot: Option<SnapshotEntry>,
    /// Snapshots removed by retention
    pub pruned: usize,
}

/// Outcome of a full pass
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Instant the pass ran at
    pub started: DateTime<Utc>,
    /// One report per configured team, in team id order
    pub teams: Vec<TeamReport>,
    /// Worst team severity
    pub overall_status: OverallStatus,
    /// Snapshots on disk after the pass
    pub total_snapshots: u64,
    /// Bytes of snapshots on disk after the pass
    pub total_bytes: u64,
}

impl PassReport {
    /// Report for `team`, if it was part of the pass
    pub fn team(&self, team: &str) -> Option<&TeamReport> {
        self.teams.iter().find(|t| t.team == team)
    }

    /// Process exit code: 0 ok, 1 error, 2 critical
    pub fn exit_code(&self) -> i32 {
        self.overall_status.exit_code()
    }
}

/// Result of pruning one team
#[derive(Debug)]
pub struct TeamPrune {
    /// Team id
    pub team: String,
    /// What retention did, or why it could not run
    pub result: BoardResult<PruneReport>,
}

/// Runs backup passes, restores and pruning for a configuration
#[derive(Debug, Clone)]
pub struct BackupEngine {
    config: BoardkeepConfig,
    files: FileStore,
    fingerprints: FingerprintStore,
    writer: SnapshotWriter,
    restorer: Restorer,
    pruner: Pruner,
    reporter: StatusReporter,
}

impl BackupEngine {
    /// Build an engine; the configuration is validated first
    pub fn new(config: BoardkeepConfig) -> BoardResult<Self> {
        config.validate()?;
        let files = FileStore::new(config.lock_timeout());
        Ok(BackupEngine {
            fingerprints: FingerprintStore::new(config.fingerprint_store_path(), files.clone()),
            writer: SnapshotWriter::new(
                config.compression_level,
                config.exclusions.clone(),
                files.clone(),
            ),
            restorer: Restorer::new(files.clone()),
            pruner: Pruner::new(config.retention, config.lock_timeout()),
            reporter: StatusReporter::new(config.status_path(), files.clone()),
            files,
            config,
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &BoardkeepConfig {
        &self.config
    }

    /// Run one pass over every configured team as of `now`.
    ///
    /// Never fails as a whole; failures are carried in the per-team reports
    /// and the overall status.
    pub fn run_pass(&self, now: DateTime<Utc>) -> PassReport {
        info!(target: "boardkeep::pass", teams = self.config.teams.len(), "Backup pass started");

        let teams: Vec<TeamReport> = self
            .config
            .team_ids()
            .map(|team| self.run_team(team, now))
            .collect();
        let overall_status = teams
            .iter()
            .fold(OverallStatus::Ok, |acc, t| acc.worst(t.severity));
        let (total_snapshots, total_bytes) = self.disk_totals();

        let stats = AggregateStats {
            overall_status,
            total_snapshots,
            total_bytes,
        };
        if let Err(e) = self.reporter.finalize(&stats, now) {
            warn!(target: "boardkeep::pass", error = %e, "Failed to write pass status");
        }

        info!(
            target: "boardkeep::pass",
            overall = %overall_status,
            snapshots = total_snapshots,
            bytes = total_bytes,
            "Backup pass completed"
        );
        PassReport {
            started: now,
            teams,
            overall_status,
            total_snapshots,
            total_bytes,
        }
    }

    /// Process a single team as of `now` and record the outcome.
    ///
    /// Unknown team ids produce an error report rather than a panic.
    pub fn run_team(&self, team: &str, now: DateTime<Utc>) -> TeamReport {
        let mut report = match self.config.team_paths(team) {
            Ok(paths) => self.process_team(&paths, now),
            Err(e) => failure(team, OverallStatus::Error, e.to_string()),
        };

        let latest = self
            .config
            .team_paths(team)
            .ok()
            .and_then(|paths| latest_snapshot(paths.backup_dir()).ok().flatten());
        let record = StatusRecord {
            team,
            action: report.action,
            message: &report.message,
            latest_snapshot: latest.as_ref().map(|e| e.path.as_path()),
        };
        if let Err(e) = self.reporter.record(&record, now) {
            warn!(target: "boardkeep::pass", team, error = %e, "Failed to record team status");
            report.severity = report.severity.worst(OverallStatus::Error);
        }

        match report.severity {
            OverallStatus::Ok => {
                info!(target: "boardkeep::pass", team, action = %report.action, message = %report.message, "Team processed")
            }
            OverallStatus::Error => {
                warn!(target: "boardkeep::pass", team, action = %report.action, message = %report.message, "Team failed")
            }
            OverallStatus::Critical => {
                error!(target: "boardkeep::pass", team, message = %report.message, "Team unrecoverable")
            }
        }
        report
    }

    fn process_team(&self, paths: &TeamPaths, now: DateTime<Utc>) -> TeamReport {
        let team = paths.team();
        for dir in [paths.team_root(), paths.backup_dir()] {
            if let Err(e) = cleanup_stale_temp_files(dir, STALE_TEMP_AGE, now) {
                warn!(target: "boardkeep::pass", team, dir = ?dir, error = %e, "Temp cleanup failed");
            }
        }

        let mut report = match check_document(&self.files, &paths.board()) {
            Err(e) => failure(team, OverallStatus::Error, format!("health check failed: {}", e)),
            Ok(DocumentHealth::Missing) => failure(
                team,
                OverallStatus::Error,
                format!("board document missing: {}", paths.board().display()),
            ),
            Ok(health) if health.is_corrupt() => self.auto_restore(paths, &health, now),
            Ok(_) => self.backup(paths, now),
        };

        match self.pruner.prune(paths.backup_dir(), now, false) {
            Ok(pruned) => report.pruned = pruned.deleted.len(),
            Err(e) => {
                report.severity = report.severity.worst(OverallStatus::Error);
                report.message = format!("{}; prune failed: {}", report.message, e);
            }
        }
        report
    }

    fn auto_restore(
        &self,
        paths: &TeamPaths,
        health: &DocumentHealth,
        now: DateTime<Utc>,
    ) -> TeamReport {
        let team = paths.team();
        warn!(target: "boardkeep::restore", team, health = %health, "Corrupt board detected");

        match self.restorer.restore_team(paths, None, now) {
            Ok(restored) => TeamReport {
                team: team.to_string(),
                action: BackupAction::AutoRestore,
                severity: OverallStatus::Ok,
                message: format!(
                    "board was {}; restored from {}",
                    health.label(),
                    restored.snapshot.file_name()
                ),
                snapshot: Some(restored.snapshot),
                pruned: 0,
            },
            Err(e @ BoardError::NoValidSnapshot { .. }) => failure(
                team,
                OverallStatus::Critical,
                format!("board is {} and {}", health.label(), e),
            ),
            Err(e) => failure(
                team,
                OverallStatus::Error,
                format!("board is {}; restore failed: {}", health.label(), e),
            ),
        }
    }

    fn backup(&self, paths: &TeamPaths, now: DateTime<Utc>) -> TeamReport {
        let team = paths.team();
        let current = match fingerprint(paths.team_root(), &self.config.exclusions) {
            Ok(Some(fp)) => fp,
            Ok(None) => {
                return failure(team, OverallStatus::Error, "nothing to back up".to_string())
            }
            Err(e) => {
                return failure(team, OverallStatus::Error, format!("fingerprint failed: {}", e))
            }
        };

        let record = match self.fingerprints.load(team) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(target: "boardkeep::pass", team, error = %e, "Fingerprint store unreadable, backing up");
                Err(e)
            }
        };
        let stored = match &record {
            Ok(Some(r)) => StoredFingerprint::Known(&r.fingerprint),
            Ok(None) => StoredFingerprint::Absent,
            Err(_) => StoredFingerprint::Unreadable,
        };
        let latest = match latest_snapshot(paths.backup_dir()) {
            Ok(latest) => latest,
            Err(e) => {
                warn!(target: "boardkeep::pass", team, error = %e, "Cannot list snapshots");
                None
            }
        };

        let decision = decide_snapshot(
            &current,
            stored,
            latest.as_ref().map(|e| e.timestamp),
            now,
            self.config.snapshot_floor(),
        );
        let reason = match decision {
            SnapshotDecision::Skip => {
                let age = latest
                    .as_ref()
                    .map(|e| now.signed_duration_since(e.timestamp).num_minutes())
                    .unwrap_or(0);
                debug!(target: "boardkeep::pass", team, minutes_since_snapshot = age, "Unchanged");
                return TeamReport {
                    team: team.to_string(),
                    action: BackupAction::Skipped,
                    severity: OverallStatus::Ok,
                    message: format!("unchanged; last snapshot {}m ago", age),
                    snapshot: latest,
                    pruned: 0,
                };
            }
            SnapshotDecision::Take(reason) => reason,
        };

        let info = match self
            .writer
            .create_snapshot(team, paths.team_root(), paths.backup_dir(), now)
        {
            Ok(info) => info,
            Err(e) => {
                return failure(team, OverallStatus::Error, format!("snapshot failed: {}", e))
            }
        };

        // Only a snapshot that made it to disk moves the fingerprint forward
        if let Err(e) = self.fingerprints.record(team, &current, now) {
            warn!(target: "boardkeep::pass", team, error = %e, "Failed to record fingerprint");
        }

        let entry = SnapshotEntry {
            path: info.path,
            timestamp: info.timestamp,
            size_bytes: info.size_bytes,
        };
        TeamReport {
            team: team.to_string(),
            action: BackupAction::BackedUp,
            severity: OverallStatus::Ok,
            message: format!(
                "{} ({}, {} files)",
                entry.file_name(),
                reason.describe(),
                info.file_count
            ),
            snapshot: Some(entry),
            pruned: 0,
        }
    }

    /// Restore `team` from the snapshot named `snapshot`, or from the newest
    /// restorable one, and record the outcome.
    ///
    /// The team's fingerprint is forgotten afterwards so the next pass takes
    /// a fresh snapshot of the restored state.
    pub fn restore_team(
        &self,
        team: &str,
        snapshot: Option<&str>,
        now: DateTime<Utc>,
    ) -> BoardResult<RestoreReport> {
        let paths = self.config.team_paths(team)?;
        let result = snapshot
            .map(|name| find_snapshot(paths.backup_dir(), name))
            .transpose()
            .and_then(|entry| self.restorer.restore_team(&paths, entry.as_ref(), now));

        let (action, message) = match &result {
            Ok(r) => (
                BackupAction::Restored,
                format!("restored from {} ({} files)", r.snapshot.file_name(), r.files_restored),
            ),
            Err(e) => (BackupAction::Error, format!("restore failed: {}", e)),
        };
        let latest = latest_snapshot(paths.backup_dir()).ok().flatten();
        let record = StatusRecord {
            team,
            action,
            message: &message,
            latest_snapshot: latest.as_ref().map(|e| e.path.as_path()),
        };
        if let Err(e) = self.reporter.record(&record, now) {
            warn!(target: "boardkeep::restore", team, error = %e, "Failed to record restore status");
        }

        if result.is_ok() {
            if let Err(e) = self.fingerprints.forget(team) {
                warn!(target: "boardkeep::restore", team, error = %e, "Failed to reset fingerprint");
            }
        }
        result
    }

    /// Apply retention to one team, or every team when `team` is `None`.
    ///
    /// Naming an unknown team is an error; otherwise per-team failures are
    /// carried in the results.
    pub fn prune(
        &self,
        team: Option<&str>,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> BoardResult<Vec<TeamPrune>> {
        let teams: Vec<String> = match team {
            Some(t) => {
                self.config.team_paths(t)?;
                vec![t.to_string()]
            }
            None => self.config.team_ids().map(str::to_string).collect(),
        };

        Ok(teams
            .into_iter()
            .map(|team| {
                let result = self
                    .config
                    .team_paths(&team)
                    .and_then(|paths| self.pruner.prune(paths.backup_dir(), now, dry_run));
                if let Err(e) = &result {
                    warn!(target: "boardkeep::retention", team = %team, error = %e, "Prune failed");
                }
                TeamPrune { team, result }
            })
            .collect())
    }

    /// Snapshots of `team`, oldest first
    pub fn list_snapshots(&self, team: &str) -> BoardResult<Vec<SnapshotEntry>> {
        let paths = self.config.team_paths(team)?;
        list_snapshots(paths.backup_dir())
    }

    /// The persisted status document
    pub fn status(&self) -> BoardResult<BackupStatus> {
        self.reporter.load()
    }

    /// Path of the persisted status document
    pub fn status_path(&self) -> &Path {
        self.reporter.path()
    }

    fn disk_totals(&self) -> (u64, u64) {
        let mut count = 0u64;
        let mut bytes = 0u64;
        for team in self.config.team_ids() {
            let listed = self
                .config
                .team_paths(team)
                .and_then(|paths| list_snapshots(paths.backup_dir()));
            match listed {
                Ok(entries) => {
                    count += entries.len() as u64;
                    bytes += entries.iter().map(|e| e.size_bytes).sum::<u64>();
                }
                Err(e) => warn!(target: "boardkeep::pass", team, error = %e, "Cannot list snapshots"),
            }
        }
        (count, bytes)
    }
}

fn failure(team: &str, severity: OverallStatus, message: String) -> TeamReport {
    TeamReport {
        team: team.to_string(),
        action: BackupAction::Error,
        severity,
        message,
        snapshot: None,
        pruned: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    struct Env {
        _root: TempDir,
        engine: BackupEngine,
    }

    impl Env {
        fn new(teams: &[&str]) -> Env {
            let root = TempDir::new().unwrap();
            let mut config = BoardkeepConfig::new(root.path().join("backups"));
            for team in teams {
                let dir = root.path().join("boards").join(team);
                fs::create_dir_all(&dir).unwrap();
                config = config.with_team(team, dir);
            }
            let engine = BackupEngine::new(config).unwrap();
            Env {
                _root: root,
                engine,
            }
        }

        fn board(&self, team: &str) -> std::path::PathBuf {
            self.engine.config().team_paths(team).unwrap().board()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_first_pass_backs_up() {
        let env = Env::new(&["acme"]);
        fs::write(env.board("acme"), b"{\"x\":1}").unwrap();

        let report = env.engine.run_pass(t0());
        let acme = report.team("acme").unwrap();
        assert_eq!(acme.action, BackupAction::BackedUp);
        assert_eq!(report.overall_status, OverallStatus::Ok);
        assert_eq!(report.total_snapshots, 1);
        assert!(acme.message.contains("first backup"));
    }

    #[test]
    fn test_missing_board_is_error_without_restore() {
        let env = Env::new(&["acme"]);
        let report = env.engine.run_pass(t0());
        let acme = report.team("acme").unwrap();
        assert_eq!(acme.action, BackupAction::Error);
        assert_eq!(acme.severity, OverallStatus::Error);
        assert!(!env.board("acme").exists());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_floor_forces_snapshot_of_unchanged_board() {
        let env = Env::new(&["acme"]);
        fs::write(env.board("acme"), b"{\"x\":1}").unwrap();
        env.engine.run_pass(t0());

        let later = t0() + Duration::hours(25);
        let report = env.engine.run_pass(later);
        let acme = report.team("acme").unwrap();
        assert_eq!(acme.action, BackupAction::BackedUp);
        assert!(acme.message.contains("no recent snapshot"));
    }

    #[test]
    fn test_unreadable_fingerprint_store_fails_open() {
        let env = Env::new(&["acme"]);
        fs::write(env.board("acme"), b"{\"x\":1}").unwrap();
        env.engine.run_pass(t0());
        fs::write(env.engine.config().fingerprint_store_path(), b"{{{").unwrap();

        let report = env.engine.run_pass(t0() + Duration::minutes(5));
        assert_eq!(report.team("acme").unwrap().action, BackupAction::BackedUp);
        // The store is healed by the successful snapshot
        let again = env.engine.run_pass(t0() + Duration::minutes(10));
        assert_eq!(again.team("acme").unwrap().action, BackupAction::Skipped);
    }

    #[test]
    fn test_unknown_team() {
        let env = Env::new(&["acme"]);
        let report = env.engine.run_team("ghost", t0());
        assert_eq!(report.action, BackupAction::Error);
        assert!(matches!(
            env.engine.list_snapshots("ghost"),
            Err(BoardError::TeamNotFound(_))
        ));
        assert!(env.engine.prune(Some("ghost"), t0(), true).is_err());
    }

    #[test]
    fn test_manual_restore_from_named_snapshot() {
        let env = Env::new(&["acme"]);
        fs::write(env.board("acme"), b"{\"v\":1}").unwrap();
        env.engine.run_pass(t0());
        fs::write(env.board("acme"), b"{\"v\":2}").unwrap();
        env.engine.run_pass(t0() + Duration::hours(1));

        let first = env.engine.list_snapshots("acme").unwrap()[0].file_name();
        let report = env
            .engine
            .restore_team("acme", Some(&first), t0() + Duration::hours(2))
            .unwrap();
        assert_eq!(report.snapshot.file_name(), first);
        assert_eq!(fs::read(env.board("acme")).unwrap(), b"{\"v\":1}");

        let status = env.engine.status().unwrap();
        assert_eq!(status.teams["acme"].last_action, Some(BackupAction::Restored));

        // Fingerprint was reset, so the restored state gets its own snapshot
        let next = env.engine.run_pass(t0() + Duration::hours(3));
        assert_eq!(next.team("acme").unwrap().action, BackupAction::BackedUp);
    }

    #[test]
    fn test_restore_unknown_snapshot_records_error() {
        let env = Env::new(&["acme"]);
        fs::write(env.board("acme"), b"{\"v\":1}").unwrap();
        env.engine.run_pass(t0());

        let err = env
            .engine
            .restore_team("acme", Some("backup_19990101_000000.tar.zst"), t0())
            .unwrap_err();
        assert!(matches!(err, BoardError::SnapshotNotFound(_)));
        assert_eq!(
            env.engine.status().unwrap().teams["acme"].last_action,
            Some(BackupAction::Error)
        );
    }
}
