//! Interrupted writes leave the old document intact.

use std::fs;

use boardkeep::{CrashPoint, Update};
use tempfile::TempDir;

use crate::common::*;

const ORIGINAL: &[u8] = b"{\"lastUpdated\":\"T0\",\"tasks\":[1,2,3]}";

fn interrupted_write(point: CrashPoint) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acme-board.json");
    fs::write(&path, ORIGINAL).unwrap();

    let crashing = file_store().with_crash_point(point);
    let replacement = vec![b'x'; 64 * 1024];
    let result = crashing.update_exclusive(&path, |_| Ok(Update::Write(replacement)));
    assert!(result.is_err());

    // Original is whole, and nothing else is left behind
    assert_eq!(fs::read(&path).unwrap(), ORIGINAL);
    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| boardkeep::is_temp_write(n))
        .collect();
    assert!(leftovers.is_empty(), "temporaries left: {:?}", leftovers);

    // The lock was released: a normal writer gets through
    file_store()
        .update_exclusive(&path, |_| Ok(Update::Write(b"{\"ok\":true}".to_vec())))
        .unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"{\"ok\":true}");
}

#[test]
fn crash_mid_temp_write_keeps_original() {
    interrupted_write(CrashPoint::MidTempWrite);
}

#[test]
fn crash_before_rename_keeps_original() {
    interrupted_write(CrashPoint::BeforeRename);
}

#[test]
fn failed_transform_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acme-board.json");
    fs::write(&path, ORIGINAL).unwrap();

    let err = file_store()
        .update_exclusive(&path, |_| Err(BoardError::archive("transform refused")))
        .unwrap_err();
    assert!(matches!(err, BoardError::Archive(_)));
    assert_eq!(fs::read(&path).unwrap(), ORIGINAL);
}
