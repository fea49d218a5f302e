//! Snapshot file names
//!
//! `backup_<YYYYMMDD>_<HHMMSS>.tar.zst`, always UTC, zero-padded.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Prefix of every snapshot file name
pub const SNAPSHOT_PREFIX: &str = "backup_";

/// Extension of every snapshot file name
pub const SNAPSHOT_EXTENSION: &str = "tar.zst";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;

/// File name for a snapshot taken at `at` (sub-second part is dropped)
pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        SNAPSHOT_PREFIX,
        at.format(STAMP_FORMAT),
        SNAPSHOT_EXTENSION
    )
}

/// Parse the timestamp out of a snapshot file name
pub fn parse_snapshot_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_EXTENSION)?
        .strip_suffix('.')?;
    if stamp.len() != STAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
