//! Corrupt boards are restored; unrecoverable ones are isolated.

use std::fs;

use crate::common::*;

#[test]
fn zero_length_board_is_restored() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"x\":1}");
    let engine = boards.engine();
    engine.run_pass(t0());

    boards.write_board("acme", b"");
    let report = engine.run_pass(t0() + ChronoDuration::hours(1));
    let acme = report.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::AutoRestore);
    assert_eq!(acme.severity, OverallStatus::Ok);
    assert_eq!(boards.read_board("acme"), b"{\"x\":1}");

    let status = engine.status().unwrap();
    assert_eq!(status.teams["acme"].last_action, Some(BackupAction::AutoRestore));
}

#[test]
fn invalid_json_board_is_restored_and_quarantined() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"x\":1}");
    let engine = boards.engine();
    engine.run_pass(t0());

    boards.write_board("acme", b"{\"x\":1,");
    let report = engine.run_pass(t0() + ChronoDuration::hours(1));
    assert_eq!(report.team("acme").unwrap().action, BackupAction::AutoRestore);

    let quarantine = boards.paths("acme").quarantine_dir();
    let kept: Vec<_> = fs::read_dir(&quarantine).unwrap().collect();
    assert_eq!(kept.len(), 1);
}

#[test]
fn corrupt_newest_snapshot_falls_back_to_older() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"v\":1}");
    let engine = boards.engine();
    engine.run_pass(t0());
    boards.write_board("acme", b"{\"v\":2}");
    engine.run_pass(t0() + ChronoDuration::hours(1));

    let names = boards.snapshot_names("acme");
    let newest = boards.paths("acme").backup_dir().join(&names[1]);
    fs::write(&newest, b"not an archive").unwrap();

    boards.write_board("acme", b"");
    let report = engine.run_pass(t0() + ChronoDuration::hours(2));
    let acme = report.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::AutoRestore);
    assert_eq!(acme.snapshot.as_ref().unwrap().file_name(), names[0]);
    assert_eq!(boards.read_board("acme"), b"{\"v\":1}");
}

#[test]
fn no_valid_snapshot_is_critical_and_isolated() {
    let boards = TestBoards::new(&["acme", "beta", "gamma"]);
    boards.write_board("acme", b"");
    boards.write_board("beta", b"{\"ok\":true}");
    // gamma has no board at all
    let engine = boards.engine();

    let report = engine.run_pass(t0());
    let acme = report.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::Error);
    assert_eq!(acme.severity, OverallStatus::Critical);
    assert_eq!(report.team("beta").unwrap().action, BackupAction::BackedUp);
    assert_eq!(report.team("gamma").unwrap().severity, OverallStatus::Error);

    assert_eq!(report.overall_status, OverallStatus::Critical);
    assert_eq!(report.exit_code(), 2);
    assert_eq!(boards.read_board("acme"), b"");

    let status = engine.status().unwrap();
    assert_eq!(status.overall_status, OverallStatus::Critical);
    assert_eq!(status.teams.len(), 3);
}
