//! Retention applied to snapshots on disk.

use std::collections::BTreeSet;
use std::fs;

use chrono::Datelike;

use crate::common::*;

fn seed_daily(boards: &TestBoards, team: &str, days: i64, start: DateTime<Utc>) {
    let dir = boards.paths(team).backup_dir().to_path_buf();
    fs::create_dir_all(&dir).unwrap();
    for d in 0..days {
        let name = boardkeep::snapshot_file_name(start + ChronoDuration::days(d));
        fs::write(dir.join(name), b"placeholder").unwrap();
    }
}

#[test]
fn four_hundred_days_with_default_policy() {
    let boards = TestBoards::new(&["acme"]);
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
    seed_daily(&boards, "acme", 400, start);
    let now = start + ChronoDuration::days(399) + ChronoDuration::hours(1);

    let engine = boards.engine();
    let results = engine.prune(Some("acme"), now, false).unwrap();
    let report = results[0].result.as_ref().unwrap();
    assert!(report.failed.is_empty());

    let left = boardkeep::list_snapshots(boards.paths("acme").backup_dir()).unwrap();
    assert_eq!(left.len(), report.kept);
    assert_eq!(left.len() + report.deleted.len(), 400);

    let newest = start + ChronoDuration::days(399);
    assert_eq!(left.last().unwrap().timestamp, newest);

    // Last 7 calendar days all survive, one each
    let days: BTreeSet<_> = left.iter().map(|e| e.timestamp.date_naive()).collect();
    for back in 0..7 {
        assert!(days.contains(&(newest - ChronoDuration::days(back)).date_naive()));
    }
    // Last 4 ISO weeks and last 6 months are each represented
    let weeks: BTreeSet<_> = left.iter().map(|e| e.timestamp.iso_week()).collect();
    for back in 0..4 {
        assert!(weeks.contains(&(newest - ChronoDuration::weeks(back)).iso_week()));
    }
    let months: BTreeSet<_> = left
        .iter()
        .map(|e| (e.timestamp.year(), e.timestamp.month()))
        .collect();
    assert_eq!(months.len(), 6);

    // Nothing older than the monthly window remains
    let oldest = left.first().unwrap().timestamp;
    assert!(newest - oldest < ChronoDuration::days(31 * 6));
}

#[test]
fn dry_run_only_reports() {
    let boards = TestBoards::new(&["acme"]);
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
    seed_daily(&boards, "acme", 60, start);
    let now = start + ChronoDuration::days(60);

    let engine = boards.engine();
    let results = engine.prune(None, now, true).unwrap();
    let report = results[0].result.as_ref().unwrap();
    assert!(report.dry_run);
    assert!(report.did_prune());
    assert_eq!(boards.snapshot_names("acme").len(), 60);
}

#[test]
fn pass_prunes_even_when_board_is_missing() {
    let boards = TestBoards::new(&["acme"]);
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
    seed_daily(&boards, "acme", 30, start);
    let now = start + ChronoDuration::days(365);

    let report = boards.engine().run_pass(now);
    let acme = report.team("acme").unwrap();
    assert_eq!(acme.action, BackupAction::Error);
    // Every snapshot is outside every window; only the newest survives
    assert_eq!(acme.pruned, 29);
    assert_eq!(boards.snapshot_names("acme").len(), 1);
}
