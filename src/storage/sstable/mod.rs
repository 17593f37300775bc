//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                            │
//! │   Magic: u32 (4) | Version: u16 (2) | Count: u32 (4)         │
//! │   SmallestKeyLen: u32 (4) | LargestKeyLen: u32 (4)           │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                        │
//! │   [KeyLen: u32][Key][ValLen: u32][Value]                     │
//! │   ... repeated for each entry, ascending by key ...          │
//! │   (ValLen = u32::MAX means tombstone, no value bytes)        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Trailer (4 bytes)                                            │
//! │   CRC32 of every key and value byte, in file order           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

mod builder;
mod reader;

use std::path::{Path, PathBuf};

pub use builder::SSTableBuilder;
pub use reader::SSTableReader;

use crate::error::Result;
use crate::record::KeyValue;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic number identifying a StrataKV segment file
pub const MAGIC: u32 = 0x1234_5678;

/// Current segment format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Count (4) + SmallestLen (4) + LargestLen (4)
pub const HEADER_SIZE: u64 = 18;

/// Offset of the entry count, patched once all entries are written
pub(crate) const COUNT_OFFSET: u64 = 6;

/// Trailer size: CRC32 (4)
pub const TRAILER_SIZE: u64 = 4;

/// Sentinel value length indicating a tombstone (deleted key)
pub const TOMBSTONE_MARKER: u32 = u32::MAX;

// =============================================================================
// SSTable Metadata
// =============================================================================

/// Metadata of a finished segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable
    pub entry_count: u32,
    /// Smallest key (empty for an empty table)
    pub min_key: Vec<u8>,
    /// Largest key (empty for an empty table)
    pub max_key: Vec<u8>,
    /// CRC32 written in the trailer
    pub checksum: u32,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Write `entries` to a new file at `path`
    ///
    /// Entries are sorted by key first; when a key appears more than once the
    /// last occurrence wins.
    pub fn write(path: &Path, entries: Vec<KeyValue>) -> Result<SSTable> {
        let entries = sort_dedup(entries);
        let mut builder = SSTableBuilder::new(path)?;
        for entry in &entries {
            builder.add(entry)?;
        }
        builder.finish()
    }

    /// Get the number of entries
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }
}

/// Sort ascending by key, keeping the last occurrence of duplicated keys
fn sort_dedup(mut entries: Vec<KeyValue>) -> Vec<KeyValue> {
    // Stable sort keeps duplicates in input order, so the last one of each
    // run is the one to keep.
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    let mut out: Vec<KeyValue> = Vec::with_capacity(entries.len());
    for entry in entries {
        match out.last_mut() {
            Some(last) if last.key == entry.key => *last = entry,
            _ => out.push(entry),
        }
    }
    out
}
