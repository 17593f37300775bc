//! Key-value records
//!
//! The unit shared by the WAL and the segment files.

use std::fmt;

use crate::error::StrataError;

/// Operation carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// Insert or overwrite a key
    Set = 0,

    /// Remove a key (a tombstone once it reaches a segment)
    Delete = 1,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Operation {
    type Error = StrataError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Operation::Set),
            1 => Ok(Operation::Delete),
            other => Err(StrataError::InvalidOperation(other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Set => f.write_str("set"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// A single key-value record
///
/// A `Delete` record in the WAL carries the value it removed; in a segment
/// its value is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

impl KeyValue {
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operation: Operation::Set,
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>, previous: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: previous.into(),
            operation: Operation::Delete,
        }
    }

    /// A segment tombstone: Delete with no value bytes
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self::delete(key, Vec::new())
    }

    pub fn is_tombstone(&self) -> bool {
        self.operation == Operation::Delete
    }
}
