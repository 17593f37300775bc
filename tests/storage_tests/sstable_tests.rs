//! Tests for SSTable
//!
//! These tests verify:
//! - Writing and reading back sorted entries
//! - The exact header and entry layout
//! - Tombstone encoding
//! - Corruption detection on every byte of a file

use std::fs;
use std::path::PathBuf;

use stratakv::storage::sstable::{HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, TRAILER_SIZE, VERSION};
use stratakv::storage::{SSTable, SSTableBuilder, SSTableReader};
use stratakv::{KeyValue, Operation, StrataError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("segment_000001.sst");
    (temp_dir, path)
}

fn sample_entries() -> Vec<KeyValue> {
    vec![
        KeyValue::set("banana", "yellow"),
        KeyValue::set("apple", "red"),
        KeyValue::tombstone("cherry"),
        KeyValue::set("date", "brown"),
    ]
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_write_then_read_sorted() {
    let (_temp, path) = setup_temp_path();

    let written = SSTable::write(&path, sample_entries()).unwrap();
    let reader = SSTableReader::open(&path).unwrap();

    assert_eq!(written.entry_count(), 4);
    assert_eq!(written.min_key, b"apple");
    assert_eq!(written.max_key, b"date");
    assert_eq!(written.file_size, fs::metadata(&path).unwrap().len());
    assert_eq!(reader.checksum(), written.checksum);

    let keys: Vec<&[u8]> = reader.entries().iter().map(|e| e.key.as_slice()).collect();
    assert_eq!(keys, vec![&b"apple"[..], &b"banana"[..], &b"cherry"[..], &b"date"[..]]);
    assert_eq!(reader.get(b"banana"), Some(&KeyValue::set("banana", "yellow")));
    assert!(reader.get(b"cherry").unwrap().is_tombstone());
    assert_eq!(reader.get(b"elderberry"), None);
}

#[test]
fn test_write_dedups_last_wins() {
    let (_temp, path) = setup_temp_path();
    let entries = vec![
        KeyValue::set("k", "first"),
        KeyValue::set("a", "x"),
        KeyValue::set("k", "second"),
    ];

    let written = SSTable::write(&path, entries).unwrap();
    let reader = SSTableReader::open(&path).unwrap();

    assert_eq!(written.entry_count(), 2);
    assert_eq!(reader.get(b"k").unwrap().value, b"second");
}

#[test]
fn test_empty_table() {
    let (_temp, path) = setup_temp_path();

    let written = SSTable::write(&path, Vec::new()).unwrap();
    let reader = SSTableReader::open(&path).unwrap();

    assert_eq!(written.file_size, HEADER_SIZE + TRAILER_SIZE);
    assert_eq!(reader.entry_count(), 0);
    assert!(!reader.might_contain(b"anything"));
}

#[test]
fn test_might_contain_range() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, sample_entries()).unwrap();
    let reader = SSTableReader::open(&path).unwrap();

    assert!(reader.might_contain(b"apple"));
    assert!(reader.might_contain(b"coconut"));
    assert!(reader.might_contain(b"date"));
    assert!(!reader.might_contain(b"aardvark"));
    assert!(!reader.might_contain(b"fig"));
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_header_layout() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, vec![KeyValue::set("a", "1"), KeyValue::set("zz", "2")]).unwrap();
    let bytes = fs::read(&path).unwrap();

    assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
    assert_eq!(&bytes[0..4], &[0x78, 0x56, 0x34, 0x12]);
    assert_eq!(&bytes[4..6], &VERSION.to_le_bytes());
    assert_eq!(&bytes[6..10], &2u32.to_le_bytes());
    assert_eq!(&bytes[10..14], &1u32.to_le_bytes());
    assert_eq!(&bytes[14..18], &2u32.to_le_bytes());

    // First entry: [1]["a"][1]["1"]
    assert_eq!(&bytes[18..22], &1u32.to_le_bytes());
    assert_eq!(bytes[22], b'a');
    assert_eq!(&bytes[23..27], &1u32.to_le_bytes());
    assert_eq!(bytes[27], b'1');
}

#[test]
fn test_checksum_covers_keys_and_values() {
    let (_temp, path) = setup_temp_path();
    let written = SSTable::write(
        &path,
        vec![KeyValue::set("a", "1"), KeyValue::tombstone("b"), KeyValue::set("c", "3")],
    )
    .unwrap();
    let bytes = fs::read(&path).unwrap();

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(b"a1bc3");
    let expected = hasher.finalize();

    assert_eq!(written.checksum, expected);
    assert_eq!(&bytes[bytes.len() - 4..], &expected.to_le_bytes());
}

#[test]
fn test_tombstone_encoding() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, vec![KeyValue::tombstone("gone")]).unwrap();
    let bytes = fs::read(&path).unwrap();

    // [4]["gone"][MARKER], no value bytes, then the trailer
    assert_eq!(&bytes[18..22], &4u32.to_le_bytes());
    assert_eq!(&bytes[22..26], b"gone");
    assert_eq!(&bytes[26..30], &TOMBSTONE_MARKER.to_le_bytes());
    assert_eq!(bytes.len(), 30 + 4);

    let reader = SSTableReader::open(&path).unwrap();
    let entry = reader.get(b"gone").unwrap();
    assert_eq!(entry.operation, Operation::Delete);
    assert!(entry.value.is_empty());
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_builder_requires_ascending_keys() {
    let (_temp, path) = setup_temp_path();
    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add_value(b"b", b"1").unwrap();

    let err = builder.add_value(b"a", b"2").unwrap_err();
    assert!(matches!(err, StrataError::Storage(_)));
    let err = builder.add_tombstone(b"b").unwrap_err();
    assert!(matches!(err, StrataError::Storage(_)));
}

#[test]
fn test_builder_patches_counts() {
    let (_temp, path) = setup_temp_path();
    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add_value(b"key1", b"v").unwrap();
    builder.add_tombstone(b"key2").unwrap();
    builder.add(&KeyValue::set("key3", "v3")).unwrap();
    let table = builder.finish().unwrap();

    assert_eq!(table.entry_count, 3);
    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 3);
    assert_eq!(reader.smallest_key(), Some(&b"key1"[..]));
    assert_eq!(reader.largest_key(), Some(&b"key3"[..]));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_every_byte_flip_is_detected() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, sample_entries()).unwrap();
    let original = fs::read(&path).unwrap();

    for i in 0..original.len() {
        let mut damaged = original.clone();
        damaged[i] ^= 0x01;
        let err = SSTableReader::decode(&path, &damaged).unwrap_err();
        assert!(err.is_corrupt_segment(), "flip at byte {} gave {:?}", i, err);
    }
}

#[test]
fn test_truncated_file_is_corrupt() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, sample_entries()).unwrap();
    let original = fs::read(&path).unwrap();

    for len in [0, 10, HEADER_SIZE as usize, original.len() - 1] {
        let err = SSTableReader::decode(&path, &original[..len]).unwrap_err();
        assert!(err.is_corrupt_segment(), "length {}", len);
    }
}

#[test]
fn test_bad_magic_message() {
    let (_temp, path) = setup_temp_path();
    SSTable::write(&path, sample_entries()).unwrap();
    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(&0xdead_beefu32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    match SSTableReader::open(&path) {
        Err(StrataError::CorruptSegment { path: p, reason }) => {
            assert_eq!(p, path);
            assert!(reason.contains("magic"), "{}", reason);
        }
        other => panic!("expected CorruptSegment, got {:?}", other),
    }
}
