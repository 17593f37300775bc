//! Storage Module
//!
//! Persistent storage layer built from immutable, checksummed segments.
//!
//! ## Responsibilities
//! - Encode and verify segment files (`sstable`)
//! - Track the live set of segments in creation order (`catalog`)
//! - Cache verified segment contents and defer deletion (`segment`)
//! - Merge segments under a file-count ceiling (`compaction`)

pub mod catalog;
pub mod compaction;
pub mod segment;
pub mod sstable;

use std::path::Path;

use crate::error::Result;

pub use catalog::SegmentCatalog;
pub use compaction::{CompactionReport, Compactor};
pub use segment::{Segment, SegmentId};
pub use sstable::{SSTable, SSTableBuilder, SSTableReader};

/// Flush a directory entry change (create/rename) to disk
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

/// Directories cannot be opened for syncing on this platform
#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
