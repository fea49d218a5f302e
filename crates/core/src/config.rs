//! Deployment configuration via `boardkeep.toml`
//!
//! Every operation takes the configuration value explicitly; nothing is
//! cached process-wide. Relative paths in the file are resolved against the
//! directory containing the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BoardError, BoardResult};
use crate::exclusion::ExclusionSet;
use crate::layout::{validate_team_id, TeamPaths, FINGERPRINT_STORE_FILE, STATUS_FILE};

/// Config file name looked up by the CLI by default.
pub const CONFIG_FILE_NAME: &str = "boardkeep.toml";

/// Retention windows for the four tiers
///
/// A window of zero disables that tier. The newest snapshot survives
/// regardless of these values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep everything younger than this many hours
    #[serde(default = "default_hourly")]
    pub hourly_hours: u32,
    /// One per calendar day for this many days
    #[serde(default = "default_daily")]
    pub daily_days: u32,
    /// One per ISO week for this many weeks
    #[serde(default = "default_weekly")]
    pub weekly_weeks: u32,
    /// One per calendar month for this many months
    #[serde(default = "default_monthly")]
    pub monthly_months: u32,
}

fn default_hourly() -> u32 {
    24
}
fn default_daily() -> u32 {
    7
}
fn default_weekly() -> u32 {
    4
}
fn default_monthly() -> u32 {
    6
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            hourly_hours: default_hourly(),
            daily_days: default_daily(),
            weekly_weeks: default_weekly(),
            monthly_months: default_monthly(),
        }
    }
}

/// Configuration loaded from `boardkeep.toml`.
///
/// # Example
///
/// ```toml
/// backup_root = "/var/lib/boardkeep"
/// lock_timeout_ms = 10000
///
/// [teams]
/// acme = "/srv/boards/acme"
///
/// [retention]
/// hourly_hours = 24
/// daily_days = 7
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardkeepConfig {
    /// Directory holding snapshots, fingerprints and status
    pub backup_root: PathBuf,
    /// Upper bound on advisory lock acquisition
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// zstd level used for snapshots (1..=22)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Take a snapshot at least this often even when nothing changed
    #[serde(default = "default_floor_hours")]
    pub snapshot_floor_hours: u32,
    /// Team id → board directory
    #[serde(default)]
    pub teams: BTreeMap<String, PathBuf>,
    /// Retention windows
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Files that are never hashed or archived
    #[serde(default)]
    pub exclusions: ExclusionSet,
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_compression_level() -> i32 {
    3
}

fn default_floor_hours() -> u32 {
    24
}

impl BoardkeepConfig {
    /// Config with defaults and no teams
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            lock_timeout_ms: default_lock_timeout_ms(),
            compression_level: default_compression_level(),
            snapshot_floor_hours: default_floor_hours(),
            teams: BTreeMap::new(),
            retention: RetentionPolicy::default(),
            exclusions: ExclusionSet::default(),
        }
    }

    /// Add a team (builder style, mostly for tests and embedding)
    pub fn with_team(mut self, team: &str, root: impl Into<PathBuf>) -> Self {
        self.teams.insert(team.to_string(), root.into());
        self
    }

    /// Lock acquisition deadline
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Minimum snapshot cadence for unchanged boards
    pub fn snapshot_floor(&self) -> Duration {
        Duration::from_secs(u64::from(self.snapshot_floor_hours) * 3600)
    }

    /// Location of the fingerprint store
    pub fn fingerprint_store_path(&self) -> PathBuf {
        self.backup_root.join(FINGERPRINT_STORE_FILE)
    }

    /// Location of the status artifact
    pub fn status_path(&self) -> PathBuf {
        self.backup_root.join(STATUS_FILE)
    }

    /// Paths for one configured team
    pub fn team_paths(&self, team: &str) -> BoardResult<TeamPaths> {
        let root = self
            .teams
            .get(team)
            .ok_or_else(|| BoardError::TeamNotFound(team.to_string()))?;
        Ok(TeamPaths::new(team, root, &self.backup_root))
    }

    /// Team ids in deterministic (sorted) order
    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        self.teams.keys().map(String::as_str)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> BoardResult<()> {
        for team in self.teams.keys() {
            validate_team_id(team)?;
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(BoardError::config(format!(
                "compression_level must be in 1..=22, got {}",
                self.compression_level
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(BoardError::config("lock_timeout_ms must be greater than 0"));
        }
        Ok(())
    }

    /// Parse config text; relative paths are resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> BoardResult<Self> {
        let mut config: BoardkeepConfig = toml::from_str(content)
            .map_err(|e| BoardError::config(format!("failed to parse config: {}", e)))?;
        config.resolve_relative(base_dir);
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> BoardResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BoardError::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base).map_err(|e| match e {
            BoardError::Config(msg) => {
                BoardError::config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `true` if a file was created.
    pub fn write_default_if_missing(path: &Path) -> BoardResult<bool> {
        if path.exists() {
            return Ok(false);
        }
        std::fs::write(path, Self::default_toml()).map_err(|e| BoardError::io(path, e))?;
        Ok(true)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Boardkeep configuration
#
# Snapshots, fingerprints and backup-status.json live here.
backup_root = "backups"

# Maximum time to wait for a board's advisory lock before reporting an error.
lock_timeout_ms = 10000

# zstd level for snapshot archives (1..=22).
compression_level = 3

# Snapshot unchanged boards at least this often.
snapshot_floor_hours = 24

# Team id = board directory (contains <team>-board.json)
[teams]
# acme = "/srv/boards/acme"

[retention]
hourly_hours = 24
daily_days = 7
weekly_weeks = 4
monthly_months = 6

[exclusions]
names = [".DS_Store"]
suffixes = ["-debug.log"]
extensions = ["lock"]
"#
    }

    fn resolve_relative(&mut self, base_dir: &Path) {
        if self.backup_root.is_relative() {
            self.backup_root = base_dir.join(&self.backup_root);
        }
        for root in self.teams.values_mut() {
            if root.is_relative() {
                *root = base_dir.join(&*root);
            }
        }
    }
}
