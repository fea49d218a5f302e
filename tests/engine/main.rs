//! Integration tests for the backup engine.
//!
//! Full passes over real board directories: idempotence, self-healing,
//! per-team isolation, retention on disk and the status document.

#[path = "../common/mod.rs"]
mod common;

mod end_to_end;
mod idempotence;
mod lock_contention;
mod retention;
mod self_healing;
