//! On-disk layout for boards and backups
//!
//! ```text
//! <team_root>/                    # one per team, from [teams] in config
//! ├── <team>-board.json           # primary board document
//! ├── <team>-board.json.lock      # lock sentinel (never archived)
//! └── ...                         # auxiliary sub-documents
//!
//! <backup_root>/
//! ├── fingerprints.json           # last fingerprint per team
//! ├── backup-status.json          # status artifact
//! └── <team>/
//!     ├── backup_YYYYMMDD_HHMMSS.tar.zst
//!     └── quarantine/             # corrupt documents replaced by restore
//! ```

use std::path::{Path, PathBuf};

use crate::error::{BoardError, BoardResult};

/// File name of the persisted fingerprint store under the backup root
pub const FINGERPRINT_STORE_FILE: &str = "fingerprints.json";

/// File name of the status artifact under the backup root
pub const STATUS_FILE: &str = "backup-status.json";

/// Name of the per-team quarantine directory
pub const QUARANTINE_DIR: &str = "quarantine";

/// Extension appended to a document path to form its lock sentinel
pub const LOCK_EXTENSION: &str = "lock";

/// Sentinel path for a document: `<path>.lock`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(LOCK_EXTENSION);
    PathBuf::from(os)
}

/// Check that a team id is safe to use in file and directory names
pub fn validate_team_id(team: &str) -> BoardResult<()> {
    let ok = !team.is_empty()
        && team
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(BoardError::InvalidTeam(team.to_string()))
    }
}

/// File name of a team's primary board document
pub fn board_file_name(team: &str) -> String {
    format!("{}-board.json", team)
}

/// Paths belonging to one team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPaths {
    team: String,
    team_root: PathBuf,
    backup_dir: PathBuf,
}

impl TeamPaths {
    /// Build paths for `team` whose board directory is `team_root`
    pub fn new(team: &str, team_root: impl AsRef<Path>, backup_root: impl AsRef<Path>) -> Self {
        TeamPaths {
            team: team.to_string(),
            team_root: team_root.as_ref().to_path_buf(),
            backup_dir: backup_root.as_ref().join(team),
        }
    }

    /// Team id
    pub fn team(&self) -> &str {
        &self.team
    }

    /// The live board directory
    pub fn team_root(&self) -> &Path {
        &self.team_root
    }

    /// The primary board document
    pub fn board(&self) -> PathBuf {
        self.team_root.join(board_file_name(&self.team))
    }

    /// Directory holding this team's snapshots
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Directory receiving corrupt documents before they are overwritten
    pub fn quarantine_dir(&self) -> PathBuf {
        self.backup_dir.join(QUARANTINE_DIR)
    }
}
