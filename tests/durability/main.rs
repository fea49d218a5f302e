//! Integration tests for the durability layer.
//!
//! These tests exercise the guarantees that only show up across threads,
//! processes-worth of file handles, or a full write/read cycle on disk:
//! no lost updates under contention, atomicity when a write is interrupted,
//! and byte-exact snapshot round trips. Unit tests in crates/durability/src/
//! cover each module in isolation.

#[path = "../common/mod.rs"]
mod common;

mod concurrent_updates;
mod crash_atomicity;
mod snapshot_round_trip;
