//! Backup engine for boardkeep
//!
//! This crate orchestrates the durability layer:
//! - Backup passes: health check, auto-restore, change detection, snapshot,
//!   retention, status reporting
//! - Explicit restores and prune-only runs
//! - The persisted status document
//!
//! The engine is the only component that knows about:
//! - The set of configured teams
//! - Per-team isolation of failures
//! - How outcomes map onto status actions and severities

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pass;
pub mod status;

pub use pass::{BackupEngine, PassReport, TeamPrune, TeamReport};
pub use status::{
    AggregateStats, BackupAction, BackupStatus, OverallStatus, StatusRecord, StatusReporter,
    TeamStatus,
};
