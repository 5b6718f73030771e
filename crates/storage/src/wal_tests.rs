// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dix_core::{Event, TimerId};
use std::io::Write as _;
use tempfile::tempdir;

fn test_event(tag: &str) -> Event {
    Event::TimerFired {
        id: TimerId::new(format!("test:{}", tag)),
    }
}

#[test]
fn open_creates_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let wal = Wal::open(&path, 0).unwrap();

    assert!(path.exists());
    assert_eq!(wal.write_seq(), 0);
    assert_eq!(wal.processed_seq(), 0);
}

#[test]
fn append_and_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal = Wal::open(&path, 0).unwrap();

    let seq1 = wal.append(&test_event("a")).unwrap();
    let seq2 = wal.append(&test_event("b")).unwrap();
    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);

    wal.flush().unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn next_unprocessed_returns_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    wal.append(&test_event("a")).unwrap();
    wal.append(&test_event("b")).unwrap();

    let e1 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(e1.seq, 1);
    let e2 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(e2.seq, 2);
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn reopen_resumes_after_processed_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        for tag in ["a", "b", "c"] {
            wal.append(&test_event(tag)).unwrap();
        }
        wal.flush().unwrap();
    }

    // Snapshot says 2 were processed; replay resumes at 3.
    let mut wal = Wal::open(&path, 2).unwrap();
    assert_eq!(wal.write_seq(), 3);
    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 3);
}

#[test]
fn corrupt_tail_is_dropped_on_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&test_event("good")).unwrap();
        wal.flush().unwrap();
    }
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(b"{\"seq\":2,\"event\":{\"ty").unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 1);
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn truncate_through_drops_checkpointed_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    for tag in ["a", "b", "c", "d"] {
        wal.append(&test_event(tag)).unwrap();
    }
    wal.flush().unwrap();

    wal.truncate_through(2).unwrap();

    let e = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(e.seq, 3);
    let e = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(e.seq, 4);
    assert!(wal.next_unprocessed().unwrap().is_none());

    // New appends continue the sequence.
    let seq = wal.append(&test_event("e")).unwrap();
    assert_eq!(seq, 5);
}

#[test]
fn needs_flush_after_threshold() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    assert!(!wal.needs_flush());
    for i in 0..100 {
        wal.append(&test_event(&i.to_string())).unwrap();
    }
    assert!(wal.needs_flush());
}
