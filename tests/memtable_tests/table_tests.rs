//! Tests for MemTable
//!
//! These tests verify:
//! - Basic put/get/delete operations
//! - Size tracking
//! - Sorted snapshots
//! - Detaching flushed entries

use stratakv::memtable::{MemTable, MemTableEntry};
use stratakv::{KeyValue, Operation};

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let table = MemTable::new();
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
    assert_eq!(table.size(), 0);
}

#[test]
fn test_put_and_get() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"value".to_vec());

    assert_eq!(table.get(b"key"), Some(&MemTableEntry::Value(b"value".to_vec())));
    assert_eq!(table.get(b"missing"), None);
}

#[test]
fn test_put_overwrites() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"one".to_vec());
    table.put(b"key".to_vec(), b"two".to_vec());

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(b"key"), Some(&MemTableEntry::Value(b"two".to_vec())));
}

#[test]
fn test_delete_leaves_tombstone() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"value".to_vec());
    table.delete(b"key".to_vec());

    assert_eq!(table.get(b"key"), Some(&MemTableEntry::Tombstone));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_apply_replayed_records() {
    let mut table = MemTable::new();
    table.apply(KeyValue::set("a", "1"));
    table.apply(KeyValue::set("b", "2"));
    table.apply(KeyValue::delete("a", "1"));

    assert_eq!(table.get(b"a"), Some(&MemTableEntry::Tombstone));
    assert_eq!(table.get(b"b"), Some(&MemTableEntry::Value(b"2".to_vec())));
}

// =============================================================================
// Size Tracking
// =============================================================================

#[test]
fn test_size_grows_and_shrinks() {
    let mut table = MemTable::new();
    let after_small = table.put(b"k".to_vec(), b"v".to_vec());
    let after_big = table.put(b"k".to_vec(), vec![0u8; 100]);
    assert!(after_big > after_small);

    let after_delete = table.delete(b"k".to_vec());
    assert!(after_delete < after_big);

    table.remove(b"k");
    assert_eq!(table.size(), 0);
}

#[test]
fn test_snapshot_sorted_with_tombstones() {
    let mut table = MemTable::new();
    table.put(b"c".to_vec(), b"3".to_vec());
    table.put(b"a".to_vec(), b"1".to_vec());
    table.delete(b"b".to_vec());

    let snapshot = table.snapshot();

    assert_eq!(
        snapshot,
        vec![
            KeyValue::set("a", "1"),
            KeyValue::tombstone("b"),
            KeyValue::set("c", "3"),
        ]
    );
    assert_eq!(snapshot[1].operation, Operation::Delete);
}

#[test]
fn test_remove_flushed_detaches_unchanged() {
    let mut table = MemTable::new();
    table.put(b"a".to_vec(), b"1".to_vec());
    table.delete(b"b".to_vec());
    let snapshot = table.snapshot();

    let removed = table.remove_flushed(&snapshot);

    assert_eq!(removed, 2);
    assert!(table.is_empty());
    assert_eq!(table.size(), 0);
}

#[test]
fn test_remove_flushed_keeps_newer_writes() {
    let mut table = MemTable::new();
    table.put(b"a".to_vec(), b"1".to_vec());
    table.put(b"b".to_vec(), b"2".to_vec());
    table.put(b"c".to_vec(), b"3".to_vec());
    let snapshot = table.snapshot();

    // Writes that land while the flush is running
    table.put(b"a".to_vec(), b"1-new".to_vec());
    table.delete(b"b".to_vec());
    table.put(b"d".to_vec(), b"4".to_vec());

    let removed = table.remove_flushed(&snapshot);

    assert_eq!(removed, 1);
    assert_eq!(table.get(b"a"), Some(&MemTableEntry::Value(b"1-new".to_vec())));
    assert_eq!(table.get(b"b"), Some(&MemTableEntry::Tombstone));
    assert_eq!(table.get(b"c"), None);
    assert_eq!(table.get(b"d"), Some(&MemTableEntry::Value(b"4".to_vec())));
}
