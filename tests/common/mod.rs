//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use boardkeep::{
    BackupAction, BackupEngine, BoardError, BoardkeepConfig, FileStore, OverallStatus,
    SnapshotReader, TeamPaths,
};
pub use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tempfile::TempDir;

/// Fixed reference instant so every suite drives the same clock
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
}

/// A file store with a short lock timeout
pub fn file_store() -> FileStore {
    FileStore::new(Duration::from_secs(5))
}

// ============================================================================
// TestBoards - temp board directories wired into a config
// ============================================================================

/// Board directories and a backup root under one temp dir.
pub struct TestBoards {
    pub dir: TempDir,
    pub config: BoardkeepConfig,
}

impl TestBoards {
    /// Create one empty board directory per team
    pub fn new(teams: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = BoardkeepConfig::new(dir.path().join("backups"));
        for team in teams {
            let root = dir.path().join("boards").join(team);
            fs::create_dir_all(&root).unwrap();
            config = config.with_team(team, root);
        }
        TestBoards { dir, config }
    }

    /// Engine over this configuration
    pub fn engine(&self) -> BackupEngine {
        BackupEngine::new(self.config.clone()).unwrap()
    }

    /// Paths for `team`
    pub fn paths(&self, team: &str) -> TeamPaths {
        self.config.team_paths(team).unwrap()
    }

    /// Primary board document of `team`
    pub fn board(&self, team: &str) -> PathBuf {
        self.paths(team).board()
    }

    /// Overwrite the board document directly, bypassing locks
    pub fn write_board(&self, team: &str, content: &[u8]) {
        fs::write(self.board(team), content).unwrap();
    }

    /// Write an auxiliary file under the team directory
    pub fn write_aux(&self, team: &str, relative: &str, content: &[u8]) {
        let path = self.paths(team).team_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Current board bytes
    pub fn read_board(&self, team: &str) -> Vec<u8> {
        fs::read(self.board(team)).unwrap()
    }

    /// Snapshot file names for `team`, oldest first
    pub fn snapshot_names(&self, team: &str) -> Vec<String> {
        boardkeep::list_snapshots(self.paths(team).backup_dir())
            .unwrap()
            .iter()
            .map(|e| e.file_name())
            .collect()
    }
}

/// Every regular file under `root` as relative path → bytes, skipping lock
/// sentinels and atomic-write temporaries
pub fn tree_contents(root: &Path) -> std::collections::BTreeMap<String, Vec<u8>> {
    boardkeep::collect_files(root, &boardkeep::ExclusionSet::default())
        .unwrap()
        .into_iter()
        .map(|f| {
            let bytes = fs::read(&f.path).unwrap();
            (f.relative, bytes)
        })
        .collect()
}
