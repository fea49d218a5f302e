//! Persisted last-known fingerprint per team
//!
//! One JSON document (`fingerprints.json`) maps team id to the fingerprint
//! recorded after that team's last successful snapshot. It goes through the
//! same [`FileStore`] discipline as board documents, so concurrent passes
//! never see it half-written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use boardkeep_core::BoardResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Fingerprint;
use crate::file_store::{FileStore, UpdateOutcome};

/// Stored fingerprint for one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Digest at the time of the snapshot
    pub fingerprint: Fingerprint,
    /// When it was recorded
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FingerprintFile {
    #[serde(default)]
    teams: BTreeMap<String, FingerprintRecord>,
}

/// Handle to the fingerprint document
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    files: FileStore,
}

impl FingerprintStore {
    /// Open (lazily) the store at `path`
    pub fn new(path: impl Into<PathBuf>, files: FileStore) -> Self {
        FingerprintStore {
            path: path.into(),
            files,
        }
    }

    /// Location of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last recorded fingerprint for `team`.
    ///
    /// An unparseable store is an error, not `None`: callers must be able
    /// to tell "never recorded" from "cannot tell".
    pub fn load(&self, team: &str) -> BoardResult<Option<FingerprintRecord>> {
        let file: Option<FingerprintFile> = self.files.read_json(&self.path)?;
        Ok(file.and_then(|mut f| f.teams.remove(team)))
    }

    /// Record `fingerprint` for `team`
    pub fn record(
        &self,
        team: &str,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> BoardResult<UpdateOutcome> {
        self.files
            .update_json::<FingerprintFile, _>(&self.path, |current| {
                let mut file = current.unwrap_or_default();
                let unchanged = file
                    .teams
                    .get(team)
                    .map_or(false, |r| &r.fingerprint == fingerprint && r.recorded_at == now);
                if unchanged {
                    return Ok(None);
                }
                file.teams.insert(
                    team.to_string(),
                    FingerprintRecord {
                        fingerprint: fingerprint.clone(),
                        recorded_at: now,
                    },
                );
                Ok(Some(file))
            })
    }

    /// Forget a team's fingerprint; the next pass will snapshot it
    pub fn forget(&self, team: &str) -> BoardResult<UpdateOutcome> {
        self.files
            .update_json::<FingerprintFile, _>(&self.path, |current| {
                let Some(mut file) = current else {
                    return Ok(None);
                };
                Ok(file.teams.remove(team).map(|_| file))
            })
    }
}
