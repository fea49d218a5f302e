//! Durability layer for boardkeep
//!
//! This crate handles everything that touches disk:
//!
//! - Advisory sentinel locks with bounded waits
//! - Lock-protected atomic document read / read-modify-write
//! - Directory fingerprints and the snapshot decision
//! - Snapshot creation, verification and listing (`.tar.zst`)
//! - Tiered retention and pruning
//! - Board health classification and restore from snapshots
//! - Cleanup of abandoned atomic-write temporaries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup; // Stale temporary removal
pub mod file_store; // Atomic read-modify-write primitive
pub mod fingerprint; // Change detection and the persisted fingerprint store
pub mod health; // Board document classification
pub mod lock; // Sentinel advisory locks
pub mod restore; // Snapshot restore and quarantine
pub mod retention; // Retention policy evaluation and pruning
pub mod snapshot; // Snapshot archives: naming, catalog, writer, reader

// === Re-exports ===
pub use cleanup::{cleanup_stale_temp_files, STALE_TEMP_AGE};
pub use file_store::{temp_path_for, CrashPoint, FileStore, Update, UpdateOutcome};
pub use fingerprint::{
    collect_files, decide_snapshot, fingerprint, Fingerprint, FingerprintRecord,
    FingerprintStore, SnapshotDecision, SnapshotReason, StoredFingerprint, TeamFile,
};
pub use health::{check_document, DocumentHealth};
pub use lock::{DocumentLock, LockMode};
pub use restore::{
    find_restorable, restore_snapshot_to, snapshot_is_restorable, RestoreReport, Restorer,
    SkippedSnapshot,
};
pub use retention::{
    plan_retention, KeepReason, PruneReport, Pruner, Retained, RetentionPlan, RetentionPolicy,
};
pub use snapshot::{
    find_snapshot, latest_snapshot, list_snapshots, parse_snapshot_name, snapshot_file_name,
    SnapshotEntry, SnapshotInfo, SnapshotReader, SnapshotVerifyInfo, SnapshotWriter,
    SNAPSHOT_EXTENSION, SNAPSHOT_PREFIX,
};
