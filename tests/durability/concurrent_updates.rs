//! Many writers, one document.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use boardkeep::{FileStore, Update};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::common::*;

fn increment(files: &FileStore, path: &std::path::Path) -> Result<(), BoardError> {
    files
        .update_exclusive(path, |current| {
            let mut doc: Value = match current {
                Some(bytes) => serde_json::from_slice(bytes)?,
                None => json!({ "counter": 0 }),
            };
            let next = doc["counter"].as_u64().unwrap_or(0) + 1;
            doc["counter"] = json!(next);
            Ok(Update::Write(serde_json::to_vec(&doc)?))
        })
        .map(|_| ())
}

#[test]
fn no_lost_updates_across_threads() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let dir = TempDir::new().unwrap();
    let path = Arc::new(dir.path().join("acme-board.json"));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let files = FileStore::new(Duration::from_secs(30));
                barrier.wait();
                let mut ok = 0usize;
                for _ in 0..PER_THREAD {
                    if increment(&files, &path).is_ok() {
                        ok += 1;
                    }
                }
                ok
            })
        })
        .collect();

    let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let doc: Value = serde_json::from_slice(&std::fs::read(&*path).unwrap()).unwrap();
    assert_eq!(doc["counter"].as_u64().unwrap() as usize, successes);
    assert_eq!(successes, THREADS * PER_THREAD);
}

#[test]
fn readers_never_see_partial_documents() {
    let dir = TempDir::new().unwrap();
    let path = Arc::new(dir.path().join("acme-board.json"));
    let files = file_store();
    increment(&files, &path).unwrap();

    let writer = {
        let path = Arc::clone(&path);
        thread::spawn(move || {
            let files = file_store();
            for _ in 0..100 {
                increment(&files, &path).unwrap();
            }
        })
    };

    let reader = {
        let path = Arc::clone(&path);
        thread::spawn(move || {
            let files = file_store();
            let mut last = 0u64;
            for _ in 0..200 {
                let bytes = files.read_shared(&path).unwrap().unwrap();
                let doc: Value = serde_json::from_slice(&bytes).unwrap();
                let n = doc["counter"].as_u64().unwrap();
                assert!(n >= last, "counter went backwards");
                last = n;
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn contended_lock_times_out_with_typed_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("acme-board.json");
    std::fs::write(&path, b"{}").unwrap();

    let _held = boardkeep::DocumentLock::acquire(
        &path,
        boardkeep::LockMode::Exclusive,
        Duration::from_secs(1),
    )
    .unwrap();

    let impatient = FileStore::new(Duration::from_millis(100));
    let err = impatient
        .update_exclusive(&path, |_| Ok(Update::Write(b"{\"x\":1}".to_vec())))
        .unwrap_err();
    assert!(err.is_lock_timeout());
    assert_eq!(std::fs::read(&path).unwrap(), b"{}");
}
