//! boardkeep - durable team board documents
//!
//! boardkeep guards per-team JSON board documents against lost updates,
//! torn writes and silent corruption:
//!
//! - Every read and read-modify-write goes through an advisory sentinel lock
//!   and an atomic write-fsync-rename
//! - Board directories are fingerprinted and archived into timestamped
//!   `.tar.zst` snapshots when they change
//! - Corrupt boards are restored from the newest valid snapshot
//! - Snapshots are thinned by a tiered hourly/daily/weekly/monthly policy
//! - Every outcome lands in a status document for external consumers
//!
//! # Quick Start
//!
//! ```ignore
//! use boardkeep::{BackupEngine, BoardkeepConfig};
//! use chrono::Utc;
//!
//! let config = BoardkeepConfig::new("/var/backups/boards")
//!     .with_team("acme", "/srv/boards/acme");
//! let engine = BackupEngine::new(config)?;
//!
//! let report = engine.run_pass(Utc::now());
//! std::process::exit(report.exit_code());
//! ```
//!
//! # Architecture
//!
//! [`BackupEngine`] is the entry point. The durability primitives
//! ([`FileStore`], [`SnapshotWriter`], [`Pruner`], ...) are re-exported for
//! callers that write board documents themselves.

pub use boardkeep_core::*;
pub use boardkeep_durability::*;
pub use boardkeep_engine::*;
