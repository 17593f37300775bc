//! WAL Reader
//!
//! Handles reading records from the WAL file.

use std::fs;
use std::path::Path;

use crate::error::{Result, StrataError};
use crate::record::KeyValue;

use super::entry::{self, Decoded};

/// Reads records from a WAL file, front to back
pub struct WalReader {
    /// Whole log contents
    data: Vec<u8>,

    /// Offset of the next undecoded byte
    offset: usize,

    /// Set once a torn record has been reported
    done: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_bytes(fs::read(path)?))
    }

    /// Read records from an in-memory copy of a log
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            offset: 0,
            done: false,
        }
    }

    /// Read the next record from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(record))` for a valid record
    /// - `Ok(None)` at a clean end of log
    /// - `Err(InvalidOperation)` for a record with an unknown op tag; the
    ///   reader has already moved past it and the next call continues
    /// - `Err(WalCorruption)` for a torn final record; `offset()` still points
    ///   at its first byte
    pub fn next_record(&mut self) -> Result<Option<KeyValue>> {
        if self.done || self.offset == self.data.len() {
            return Ok(None);
        }

        let mut remaining = &self.data[self.offset..];
        let before = remaining.len();
        match entry::decode(&mut remaining) {
            Decoded::Record(record) => {
                self.offset += before - remaining.len();
                Ok(Some(record))
            }
            Decoded::InvalidOperation(tag) => {
                self.offset += before - remaining.len();
                Err(StrataError::InvalidOperation(tag))
            }
            Decoded::Incomplete => {
                self.done = true;
                Err(StrataError::WalCorruption(format!(
                    "incomplete record at offset {} ({} trailing bytes)",
                    self.offset, before
                )))
            }
        }
    }

    /// Offset just past the last fully decoded record
    pub fn offset(&self) -> u64 {
        self.offset as u64
    }

    /// Total bytes in the log
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Iterator for WalReader {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
