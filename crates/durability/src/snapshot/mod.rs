//! Team directory snapshots
//!
//! A snapshot is one immutable `backup_YYYYMMDD_HHMMSS.tar.zst` archive
//! holding every non-transient file of a team directory at their relative
//! paths. Names sort lexicographically in chronological order.
//!
//! ## Archive Structure
//!
//! ```text
//! backup_20240501_120000.tar.zst
//! ├── acme-board.json
//! └── epics/
//!     └── e1.json
//! ```
//!
//! ## Crash Safety
//!
//! The archive is written to a hidden temporary in the backup directory,
//! fsynced, read back in full, and only then renamed into place. A crash at
//! any point leaves either no snapshot or a complete, verified one.

pub mod catalog;
pub mod naming;
pub mod reader;
pub mod writer;

pub use catalog::{find_snapshot, latest_snapshot, list_snapshots, SnapshotEntry};
pub use naming::{parse_snapshot_name, snapshot_file_name, SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX};
pub use reader::{SnapshotReader, SnapshotVerifyInfo};
pub use writer::{SnapshotInfo, SnapshotWriter};
