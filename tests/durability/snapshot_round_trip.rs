//! Snapshot → restore reproduces the board directory.

use std::fs;

use boardkeep::{restore_snapshot_to, ExclusionSet, SnapshotWriter};
use tempfile::TempDir;

use crate::common::*;

#[test]
fn restore_to_empty_location_is_byte_exact() {
    let boards = TestBoards::new(&["acme"]);
    boards.write_board("acme", b"{\"lastUpdated\":\"T0\",\"x\":1}");
    boards.write_aux("acme", "epics/e1.json", b"{\"title\":\"launch\"}");
    boards.write_aux("acme", "epics/deep/nested.json", &[0u8, 159, 146, 150]);
    boards.write_aux("acme", "hook-debug.log", b"transient");
    boards.write_aux("acme", ".DS_Store", b"finder");
    boards.write_aux("acme", "acme-board.json.lock", b"");

    let paths = boards.paths("acme");
    let info = SnapshotWriter::new(3, ExclusionSet::default(), file_store())
        .create_snapshot("acme", paths.team_root(), paths.backup_dir(), t0())
        .unwrap();
    assert_eq!(info.file_count, 3);

    let out = TempDir::new().unwrap();
    let restored = out.path().join("acme");
    restore_snapshot_to(&info.path, &restored).unwrap();

    assert_eq!(tree_contents(&restored), tree_contents(paths.team_root()));
    assert!(!restored.join("hook-debug.log").exists());
}

#[test]
fn truncated_snapshot_is_never_restorable() {
    let boards = TestBoards::new(&["acme"]);
    let big: Vec<u8> = (0..200_000u32).flat_map(|i| i.to_le_bytes()).collect();
    boards.write_board("acme", b"{\"x\":1}");
    boards.write_aux("acme", "blob.bin", &big);

    let paths = boards.paths("acme");
    let info = SnapshotWriter::new(3, ExclusionSet::default(), file_store())
        .create_snapshot("acme", paths.team_root(), paths.backup_dir(), t0())
        .unwrap();

    let bytes = fs::read(&info.path).unwrap();
    fs::write(&info.path, &bytes[..bytes.len() - 16]).unwrap();
    assert!(boardkeep::snapshot_is_restorable(&info.path, "acme-board.json").is_err());
    assert!(matches!(
        boardkeep::find_restorable(&paths),
        Err(BoardError::NoValidSnapshot { checked: 1, .. })
    ));
}
