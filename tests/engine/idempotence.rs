//! Repeated passes over unchanged boards.

use std::fs;

use crate::common::*;

#[test]
fn second_pass_without_changes_takes_no_snapshot() {
    let boards = TestBoards::new(&["acme", "beta"]);
    boards.write_board("acme", b"{\"x\":1}");
    boards.write_board("beta", b"{\"y\":2}");
    let engine = boards.engine();

    let first = engine.run_pass(t0());
    assert!(first.teams.iter().all(|t| t.action == BackupAction::BackedUp));
    assert_eq!(first.total_snapshots, 2);

    let second = engine.run_pass(t0() + ChronoDuration::minutes(30));
    assert!(second.teams.iter().all(|t| t.action == BackupAction::Skipped));
    assert_eq!(second.total_snapshots, 2);
    assert_eq!(second.exit_code(), 0);
}

#[test]
fn lock_sentinels_and_debug_logs_do_not_count_as_changes() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"x\":1}");
    let engine = boards.engine();
    engine.run_pass(t0());

    boards.write_aux("acme", "session-debug.log", b"noise");
    boards.write_aux("acme", "epics/e1.json.lock", b"");
    boards.write_aux("acme", ".DS_Store", b"meta");

    let report = engine.run_pass(t0() + ChronoDuration::minutes(5));
    assert_eq!(report.team("acme").unwrap().action, BackupAction::Skipped);
}

#[test]
fn renaming_a_file_is_a_change() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"x\":1}");
    boards.write_aux("acme", "epics/a.json", b"{}");
    let engine = boards.engine();
    engine.run_pass(t0());

    let root = boards.paths("acme").team_root().to_path_buf();
    fs::rename(root.join("epics/a.json"), root.join("epics/b.json")).unwrap();

    let report = engine.run_pass(t0() + ChronoDuration::minutes(5));
    assert_eq!(report.team("acme").unwrap().action, BackupAction::BackedUp);
    assert_eq!(boards.snapshot_names("acme").len(), 2);
}

#[test]
fn hidden_tmp_files_are_backed_up_and_never_swept() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"x\":1}");
    boards.write_aux("acme", ".draft.tmp", b"half-written epic");
    let engine = boards.engine();

    // Real clock: the sweep compares against file mtimes
    let now = Utc::now();
    let first = engine.run_pass(now);
    let acme = first.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::BackedUp);
    let entries = SnapshotReader::list_entries(&acme.snapshot.as_ref().unwrap().path).unwrap();
    assert_eq!(entries, vec![".draft.tmp", "acme-board.json"]);

    engine.run_pass(now + ChronoDuration::hours(2));
    let draft = boards.paths("acme").team_root().join(".draft.tmp");
    assert_eq!(fs::read(draft).unwrap(), b"half-written epic");
}
