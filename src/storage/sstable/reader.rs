//! SSTable Reader
//!
//! Loads a segment file into memory and verifies it before any entry is
//! handed out.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Buf;

use crate::error::{Result, StrataError};
use crate::record::KeyValue;

use super::{HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, TRAILER_SIZE, VERSION};

/// A fully loaded, checksum-verified SSTable
#[derive(Debug)]
pub struct SSTableReader {
    path: PathBuf,
    /// Entries in ascending key order
    entries: Vec<KeyValue>,
    checksum: u32,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Fails with `CorruptSegment` if the file does not verify.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::decode(path, &data)
    }

    /// Decode and verify the bytes of a segment file
    ///
    /// `path` is only used to label errors.
    pub fn decode(path: &Path, data: &[u8]) -> Result<Self> {
        let corrupt = |reason: String| StrataError::corrupt(path, reason);

        if (data.len() as u64) < HEADER_SIZE + TRAILER_SIZE {
            return Err(corrupt(format!("file too short: {} bytes", data.len())));
        }

        let (body, trailer) = data.split_at(data.len() - TRAILER_SIZE as usize);
        let stored_checksum = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);

        let mut buf = body;
        let magic = buf.get_u32_le();
        if magic != MAGIC {
            return Err(corrupt(format!("bad magic number {:#010x}", magic)));
        }
        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(corrupt(format!("unsupported version {}", version)));
        }
        let entry_count = buf.get_u32_le();
        let smallest_key_len = buf.get_u32_le() as usize;
        let largest_key_len = buf.get_u32_le() as usize;

        // Every entry needs at least its two length fields
        if entry_count as usize > buf.remaining() / 8 {
            return Err(corrupt(format!(
                "entry count {} does not fit in {} bytes",
                entry_count,
                buf.remaining()
            )));
        }

        let mut hasher = crc32fast::Hasher::new();
        let mut entries: Vec<KeyValue> = Vec::with_capacity(entry_count as usize);

        for index in 0..entry_count {
            let key = read_field(&mut buf, index, "key").map_err(corrupt)?;
            if buf.remaining() < 4 {
                return Err(corrupt(format!("entry {} is missing its value length", index)));
            }
            let val_len = buf.get_u32_le();
            let entry = if val_len == TOMBSTONE_MARKER {
                hasher.update(&key);
                KeyValue::tombstone(key)
            } else {
                let value = take(&mut buf, val_len as usize)
                    .ok_or_else(|| corrupt(format!("entry {} value is truncated", index)))?;
                hasher.update(&key);
                hasher.update(&value);
                KeyValue::set(key, value)
            };

            if let Some(prev) = entries.last() {
                if entry.key <= prev.key {
                    return Err(corrupt(format!("entry {} is out of key order", index)));
                }
            }
            entries.push(entry);
        }

        if buf.has_remaining() {
            return Err(corrupt(format!(
                "{} unexpected bytes after the last entry",
                buf.remaining()
            )));
        }

        let computed = hasher.finalize();
        if computed != stored_checksum {
            return Err(corrupt(format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored_checksum, computed
            )));
        }

        let first_len = entries.first().map_or(0, |e| e.key.len());
        let last_len = entries.last().map_or(0, |e| e.key.len());
        if first_len != smallest_key_len || last_len != largest_key_len {
            return Err(corrupt(format!(
                "header key lengths {}/{} do not match entries {}/{}",
                smallest_key_len, largest_key_len, first_len, last_len
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            checksum: stored_checksum,
        })
    }

    /// Look up a key (binary search)
    ///
    /// Returns the stored record, which may be a tombstone.
    pub fn get(&self, key: &[u8]) -> Option<&KeyValue> {
        self.entries
            .binary_search_by(|entry| entry.key.as_slice().cmp(key))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// All entries in ascending key order
    pub fn entries(&self) -> &[KeyValue] {
        &self.entries
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn smallest_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|e| e.key.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn largest_key(&self) -> Option<&[u8]> {
        self.entries.last().map(|e| e.key.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.smallest_key(), self.largest_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false, // Empty SSTable
        }
    }

    /// CRC32 stored in the trailer (already verified)
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_field(buf: &mut &[u8], index: u32, what: &str) -> std::result::Result<Vec<u8>, String> {
    if buf.remaining() < 4 {
        return Err(format!("entry {} is missing its {} length", index, what));
    }
    let len = buf.get_u32_le() as usize;
    take(buf, len).ok_or_else(|| format!("entry {} {} is truncated", index, what))
}

fn take(buf: &mut &[u8], len: usize) -> Option<Vec<u8>> {
    if buf.remaining() < len {
        return None;
    }
    let out = buf[..len].to_vec();
    buf.advance(len);
    Some(out)
}
