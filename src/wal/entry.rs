//! WAL record layout
//!
//! `op:u8 | keyLen:u16-LE | key | valueLen:u16-LE | value`

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, StrataError};
use crate::record::{KeyValue, Operation};

/// Fixed bytes per record: op (1) + key length (2) + value length (2)
pub const HEADER_SIZE: usize = 5;

/// Largest key or value a WAL record can carry
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Size on disk of a record
pub fn encoded_len(record: &KeyValue) -> usize {
    HEADER_SIZE + record.key.len() + record.value.len()
}

/// Append the encoded record to `buf`
pub fn encode_into(record: &KeyValue, buf: &mut BytesMut) -> Result<()> {
    let key_len = field_len(&record.key, "key")?;
    let value_len = field_len(&record.value, "value")?;

    buf.reserve(encoded_len(record));
    buf.put_u8(record.operation.as_u8());
    buf.put_u16_le(key_len);
    buf.put_slice(&record.key);
    buf.put_u16_le(value_len);
    buf.put_slice(&record.value);
    Ok(())
}

/// Encode a single record
pub fn encode(record: &KeyValue) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(encoded_len(record));
    encode_into(record, &mut buf)?;
    Ok(buf)
}

/// Outcome of decoding one record from the front of a buffer
#[derive(Debug)]
pub enum Decoded {
    /// A complete, valid record
    Record(KeyValue),

    /// A complete record whose op tag is unknown; its bytes were consumed
    InvalidOperation(u8),

    /// Not enough bytes for a full record; nothing was consumed
    Incomplete,
}

/// Decode the record at the front of `buf`, advancing past it when complete
pub fn decode(buf: &mut &[u8]) -> Decoded {
    let Some(total) = complete_len(buf) else {
        return Decoded::Incomplete;
    };

    let mut record = &buf[..total];
    *buf = &buf[total..];

    let tag = record.get_u8();
    let key_len = record.get_u16_le() as usize;
    let key = record[..key_len].to_vec();
    record.advance(key_len);
    let value_len = record.get_u16_le() as usize;
    let value = record[..value_len].to_vec();

    match Operation::try_from(tag) {
        Ok(operation) => Decoded::Record(KeyValue {
            key,
            value,
            operation,
        }),
        Err(_) => Decoded::InvalidOperation(tag),
    }
}

/// Length of the record at the front of `buf`, or None if it is cut short
fn complete_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 3 {
        return None;
    }
    let key_len = u16::from_le_bytes([buf[1], buf[2]]) as usize;
    let value_len_at = 3 + key_len;
    if buf.len() < value_len_at + 2 {
        return None;
    }
    let value_len = u16::from_le_bytes([buf[value_len_at], buf[value_len_at + 1]]) as usize;
    let total = value_len_at + 2 + value_len;
    (buf.len() >= total).then_some(total)
}

fn field_len(field: &[u8], name: &str) -> Result<u16> {
    u16::try_from(field.len()).map_err(|_| {
        StrataError::InvalidArgument(format!(
            "{} is {} bytes, WAL records allow at most {}",
            name,
            field.len(),
            MAX_FIELD_LEN
        ))
    })
}
