//! Tests for crash recovery
//!
//! These tests verify:
//! - Unflushed writes are replayed from the WAL
//! - Deletes survive a restart
//! - A torn WAL tail is dropped on open
//! - Leftovers of an interrupted flush are cleaned up

use std::fs::{self, OpenOptions};
use std::io::Write;

use stratakv::engine::Engine;
use tempfile::TempDir;

use crate::test_config;

#[test]
fn test_replay_unflushed_writes() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp.path())).unwrap();
        engine.set(b"a", b"1").unwrap();
        engine.set(b"b", b"2").unwrap();
        engine.set(b"a", b"3").unwrap();
        // Dropped without close: nothing is flushed
    }

    let engine = Engine::open(test_config(temp.path())).unwrap();

    assert_eq!(engine.segment_count(), 0);
    assert_eq!(engine.memtable_len(), 2);
    assert_eq!(engine.get(b"a").unwrap(), b"3");
    assert_eq!(engine.get(b"b").unwrap(), b"2");
}

#[test]
fn test_replay_delete_of_flushed_key() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp.path())).unwrap();
        engine.set(b"k", b"v").unwrap();
        engine.flush().unwrap();
        engine.del(b"k").unwrap();
    }

    let engine = Engine::open(test_config(temp.path())).unwrap();

    assert!(engine.get(b"k").unwrap_err().is_not_found());
    assert!(engine.get_all().unwrap().is_empty());
}

#[test]
fn test_close_flushes_everything() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp.path())).unwrap();
        engine.set(b"k", b"v").unwrap();
        engine.close().unwrap();
    }

    assert_eq!(fs::metadata(temp.path().join("wal.log")).unwrap().len(), 0);
    let engine = Engine::open(test_config(temp.path())).unwrap();
    assert_eq!(engine.memtable_len(), 0);
    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get(b"k").unwrap(), b"v");
}

#[test]
fn test_torn_wal_tail_dropped() {
    let temp = TempDir::new().unwrap();
    let good_len = {
        let engine = Engine::open(test_config(temp.path())).unwrap();
        engine.set(b"k", b"v").unwrap();
        engine.wal_position()
    };
    {
        let mut wal = OpenOptions::new()
            .append(true)
            .open(temp.path().join("wal.log"))
            .unwrap();
        wal.write_all(&[0x00, 0x09, 0x00, b'p']).unwrap();
    }

    let engine = Engine::open(test_config(temp.path())).unwrap();

    assert_eq!(engine.get(b"k").unwrap(), b"v");
    assert_eq!(engine.wal_position(), good_len);

    // New writes land right after the last good record
    engine.set(b"k2", b"v2").unwrap();
    drop(engine);
    let engine = Engine::open(test_config(temp.path())).unwrap();
    assert_eq!(engine.get(b"k2").unwrap(), b"v2");
}

#[test]
fn test_replay_after_partial_flush() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp.path())).unwrap();
        engine.set(b"a", b"1").unwrap();
        engine.flush().unwrap();
        engine.set(b"a", b"2").unwrap();
        engine.set(b"b", b"3").unwrap();
    }
    // An interrupted segment write
    fs::write(
        temp.path().join("segments").join("segment_000002.sst.tmp"),
        b"partial",
    )
    .unwrap();

    let engine = Engine::open(test_config(temp.path())).unwrap();

    assert!(!temp.path().join("segments").join("segment_000002.sst.tmp").exists());
    assert_eq!(engine.get(b"a").unwrap(), b"2");
    assert_eq!(engine.get(b"b").unwrap(), b"3");

    let report = engine.flush().unwrap().unwrap();
    assert_eq!(report.segment.last, 2);
}
