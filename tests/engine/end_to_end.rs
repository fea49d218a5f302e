//! The `acme` lifecycle: skip, back up, self-heal.

use boardkeep::SnapshotReader;

use crate::common::*;

#[test]
fn skip_then_backup_then_auto_restore() {
    let boards = TestBoards::new(&["acme"]);
    let engine = boards.engine();
    let t = t0();

    // Baseline two hours before the scenario starts
    boards.write_board("acme", b"{\"lastUpdated\":\"T0\",\"x\":1}");
    let baseline = engine.run_pass(t - ChronoDuration::hours(2));
    assert_eq!(baseline.team("acme").unwrap().action, BackupAction::BackedUp);

    // Pass 1: unchanged, last backup 2h ago
    let pass1 = engine.run_pass(t);
    assert_eq!(pass1.team("acme").unwrap().action, BackupAction::Skipped);
    assert_eq!(boards.snapshot_names("acme").len(), 1);

    // Pass 2: board changed
    let changed: &[u8] = b"{\"lastUpdated\":\"T1\",\"x\":2}";
    boards.write_board("acme", changed);
    let pass2 = engine.run_pass(t + ChronoDuration::minutes(10));
    let acme = pass2.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::BackedUp);
    let archive = acme.snapshot.as_ref().unwrap().path.clone();
    assert_eq!(
        SnapshotReader::read_entry(&archive, "acme-board.json").unwrap(),
        Some(changed.to_vec())
    );
    assert_eq!(boards.snapshot_names("acme").len(), 2);

    // Pass 3: live file truncated
    boards.write_board("acme", b"");
    let pass3 = engine.run_pass(t + ChronoDuration::minutes(20));
    let acme = pass3.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::AutoRestore);
    assert_eq!(acme.snapshot.as_ref().unwrap().path, archive);
    assert_eq!(boards.read_board("acme"), changed);

    // Status document reflects the last action and the totals
    let status = engine.status().unwrap();
    let team = &status.teams["acme"];
    assert_eq!(team.last_action, Some(BackupAction::AutoRestore));
    assert_eq!(team.last_backup, Some(t + ChronoDuration::minutes(10)));
    assert_eq!(team.latest_snapshot.as_deref(), Some(archive.as_path()));
    assert_eq!(status.total_snapshots, 2);
    assert_eq!(status.overall_status, OverallStatus::Ok);

    // And the healed board is not snapshotted again
    let pass4 = engine.run_pass(t + ChronoDuration::minutes(30));
    assert_eq!(pass4.team("acme").unwrap().action, BackupAction::Skipped);
}
