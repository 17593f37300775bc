//! Tests for the WAL record layout
//!
//! These tests verify:
//! - Exact byte layout of Set and Delete records
//! - Length limits on key and value
//! - Decoding complete, torn and unknown-op records

use stratakv::wal::{decode, encode, encoded_len, Decoded, HEADER_SIZE, MAX_FIELD_LEN};
use stratakv::{KeyValue, Operation, StrataError};

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_set_layout() {
    let bytes = encode(&KeyValue::set("k1", "v1")).unwrap();

    assert_eq!(
        bytes.as_ref(),
        &[0x00, 0x02, 0x00, b'k', b'1', 0x02, 0x00, b'v', b'1']
    );
}

#[test]
fn test_encode_delete_carries_previous_value() {
    let bytes = encode(&KeyValue::delete("key", "old")).unwrap();

    assert_eq!(bytes[0], 0x01);
    assert_eq!(&bytes[1..3], &3u16.to_le_bytes());
    assert_eq!(&bytes[3..6], b"key");
    assert_eq!(&bytes[6..8], &3u16.to_le_bytes());
    assert_eq!(&bytes[8..], b"old");
}

#[test]
fn test_encoded_len_matches() {
    let record = KeyValue::set("alpha", "beta-value");
    assert_eq!(encoded_len(&record), HEADER_SIZE + 5 + 10);
    assert_eq!(encode(&record).unwrap().len(), encoded_len(&record));
}

#[test]
fn test_encode_rejects_oversize_key() {
    let record = KeyValue::set(vec![b'k'; MAX_FIELD_LEN + 1], "v");
    let err = encode(&record).unwrap_err();
    assert!(matches!(err, StrataError::InvalidArgument(_)));
}

#[test]
fn test_encode_accepts_max_length_value() {
    let record = KeyValue::set("k", vec![7u8; MAX_FIELD_LEN]);
    let bytes = encode(&record).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 1 + MAX_FIELD_LEN);
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_consumes_one_record() {
    let mut log = encode(&KeyValue::set("a", "1")).unwrap().to_vec();
    log.extend_from_slice(&encode(&KeyValue::delete("a", "1")).unwrap());

    let mut buf = log.as_slice();
    match decode(&mut buf) {
        Decoded::Record(record) => assert_eq!(record, KeyValue::set("a", "1")),
        other => panic!("unexpected {:?}", other),
    }
    match decode(&mut buf) {
        Decoded::Record(record) => {
            assert_eq!(record.operation, Operation::Delete);
            assert_eq!(record.value, b"1");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(buf.is_empty());
}

#[test]
fn test_decode_incomplete_consumes_nothing() {
    let full = encode(&KeyValue::set("key", "value")).unwrap();

    for cut in 0..full.len() {
        let mut buf = &full[..cut];
        assert!(matches!(decode(&mut buf), Decoded::Incomplete), "cut at {}", cut);
        assert_eq!(buf.len(), cut);
    }
}

#[test]
fn test_decode_unknown_op_is_skipped() {
    let mut log = encode(&KeyValue::set("a", "1")).unwrap().to_vec();
    log[0] = 9;
    log.extend_from_slice(&encode(&KeyValue::set("b", "2")).unwrap());

    let mut buf = log.as_slice();
    assert!(matches!(decode(&mut buf), Decoded::InvalidOperation(9)));
    match decode(&mut buf) {
        Decoded::Record(record) => assert_eq!(record.key, b"b"),
        other => panic!("unexpected {:?}", other),
    }
}
