//! A board held locked by another process fails only its own team.

use std::time::Duration;

use boardkeep::{DocumentLock, LockMode};

use crate::common::*;

#[test]
fn lock_timeout_fails_one_team_and_the_pass_continues() {
    let mut boards = TestBoards::new(&["acme", "beta"]);
    boards.config.lock_timeout_ms = 100;
    boards.write_board("acme", b"{\"x\":1}");
    boards.write_board("beta", b"{\"y\":2}");
    let engine = boards.engine();

    let _held = DocumentLock::acquire(
        &boards.board("acme"),
        LockMode::Exclusive,
        Duration::from_secs(1),
    )
    .unwrap();
    let report = engine.run_pass(t0());

    let acme = report.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::Error);
    assert_eq!(acme.severity, OverallStatus::Error);
    assert!(acme.message.contains("Timed out"), "{}", acme.message);

    assert_eq!(report.team("beta").unwrap().action, BackupAction::BackedUp);
    assert_eq!(report.overall_status, OverallStatus::Error);
    assert_eq!(report.exit_code(), 1);

    let status = engine.status().unwrap();
    assert_eq!(status.teams["acme"].last_action, Some(BackupAction::Error));
    assert_eq!(status.teams["beta"].last_action, Some(BackupAction::BackedUp));
}

#[test]
fn released_lock_lets_the_next_pass_back_up() {
    let mut boards = TestBoards::new(&["acme"]);
    boards.config.lock_timeout_ms = 100;
    boards.write_board("acme", b"{\"x\":1}");
    let engine = boards.engine();

    let held = DocumentLock::acquire(
        &boards.board("acme"),
        LockMode::Exclusive,
        Duration::from_secs(1),
    )
    .unwrap();
    assert_eq!(
        engine.run_pass(t0()).team("acme").unwrap().action,
        BackupAction::Error
    );
    drop(held);

    let report = engine.run_pass(t0() + ChronoDuration::minutes(1));
    assert_eq!(report.team("acme").unwrap().action, BackupAction::BackedUp);
    assert_eq!(report.overall_status, OverallStatus::Ok);
}
