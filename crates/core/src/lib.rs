//! Core types for Boardkeep
//!
//! This crate defines the pieces every other crate shares:
//! - [`BoardError`] / [`BoardResult`]: the single error vocabulary
//! - [`BoardkeepConfig`]: deployment configuration passed into every call
//! - [`TeamPaths`]: where a team's board, snapshots and quarantine live
//! - [`ExclusionSet`]: transient files that are never hashed or archived

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod exclusion;
pub mod layout;

pub use config::{BoardkeepConfig, RetentionPolicy, CONFIG_FILE_NAME};
pub use error::{BoardError, BoardResult};
pub use exclusion::{
    is_temp_write, temp_write_name, ExclusionSet, TEMP_WRITE_SUFFIX, TEMP_WRITE_TOKEN_LEN,
};
pub use layout::{
    board_file_name, lock_path, validate_team_id, TeamPaths, FINGERPRINT_STORE_FILE,
    QUARANTINE_DIR, STATUS_FILE,
};
