//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, StrataError};
use crate::record::{KeyValue, Operation};

use super::{SSTable, COUNT_OFFSET, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u32,
    /// Bytes written so far
    current_offset: u64,
    /// Track min/max keys for the header and metadata
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
    /// Running CRC over key and value bytes
    data_hasher: crc32fast::Hasher,
    /// Scratch buffer reused per entry
    scratch: BytesMut,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    ///
    /// Writes the header immediately with placeholder counts; call `add()` in
    /// strictly ascending key order, then `finish()` to write the trailer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);

        let mut header = BytesMut::with_capacity(HEADER_SIZE as usize);
        header.put_u32_le(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u32_le(0); // entry count, patched in finish
        header.put_u32_le(0); // smallest key length, patched in finish
        header.put_u32_le(0); // largest key length, patched in finish
        writer.write_all(&header)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            min_key: None,
            max_key: None,
            data_hasher: crc32fast::Hasher::new(),
            scratch: BytesMut::new(),
        })
    }

    /// Add an entry (must be called in strictly ascending key order)
    ///
    /// Delete entries are written as tombstones.
    pub fn add(&mut self, entry: &KeyValue) -> Result<()> {
        match entry.operation {
            Operation::Set => self.write_entry(&entry.key, Some(&entry.value)),
            Operation::Delete => self.write_entry(&entry.key, None),
        }
    }

    /// Add a key-value pair
    pub fn add_value(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_entry(key, Some(value))
    }

    /// Add a tombstone
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_entry(key, None)
    }

    /// Internal: write an entry (value=None means tombstone)
    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if let Some(prev) = &self.max_key {
            if key <= prev.as_slice() {
                return Err(StrataError::Storage(format!(
                    "SSTable keys must be strictly ascending: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(prev)
                )));
            }
        }
        let key_len = len_u32(key.len(), "key")?;
        let val_len = match value {
            Some(v) => {
                let len = len_u32(v.len(), "value")?;
                if len == TOMBSTONE_MARKER {
                    return Err(StrataError::InvalidArgument(
                        "value length collides with the tombstone marker".to_string(),
                    ));
                }
                len
            }
            None => TOMBSTONE_MARKER,
        };

        // Entry layout: [key_len(4)][key][val_len(4)][value]
        self.scratch.clear();
        self.scratch.put_u32_le(key_len);
        self.scratch.put_slice(key);
        self.scratch.put_u32_le(val_len);
        if let Some(v) = value {
            self.scratch.put_slice(v);
        }
        self.writer.write_all(&self.scratch)?;

        self.data_hasher.update(key);
        if let Some(v) = value {
            self.data_hasher.update(v);
        }

        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.max_key = Some(key.to_vec());

        self.current_offset += self.scratch.len() as u64;
        self.entry_count = self.entry_count.checked_add(1).ok_or_else(|| {
            StrataError::Storage("SSTable entry count overflow".to_string())
        })?;

        Ok(())
    }

    /// Finish building: write the trailer, patch the header, sync
    pub fn finish(mut self) -> Result<SSTable> {
        let checksum = self.data_hasher.finalize();
        self.writer.write_all(&checksum.to_le_bytes())?;
        self.writer.flush()?;

        let min_key = self.min_key.unwrap_or_default();
        let max_key = self.max_key.unwrap_or_default();

        // Seek back and fill in the counts
        let mut file = self.writer.into_inner().map_err(|e| {
            StrataError::Storage(format!("Failed to flush SSTable: {}", e))
        })?;
        let mut counts = BytesMut::with_capacity(12);
        counts.put_u32_le(self.entry_count);
        counts.put_u32_le(min_key.len() as u32);
        counts.put_u32_le(max_key.len() as u32);
        file.seek(SeekFrom::Start(COUNT_OFFSET))?;
        file.write_all(&counts)?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            checksum,
            file_size,
        })
    }
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| StrataError::InvalidArgument(format!("{} of {} bytes is too large", what, len)))
}
