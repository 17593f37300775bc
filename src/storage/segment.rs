//! Segment handles
//!
//! A `Segment` names one durable segment file in the catalog. Its contents
//! are loaded lazily, verified once, and then shared behind an `Arc`.
//!
//! ## Lifecycle
//! ```text
//! unwritten → durable (verified) → referenced ─┬─→ merged away → deleted
//!                                              └─→ quarantined (corrupt)
//! ```
//! A merged-away segment is only marked obsolete; its file is removed when
//! the last `Arc<Segment>` (catalog or in-flight reader) is dropped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, StrataError};

use super::sstable::SSTableReader;

/// Range of creation sequence numbers a segment covers
///
/// A flushed segment covers a single number; a compaction output covers the
/// span of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    pub first: u64,
    pub last: u64,
}

impl SegmentId {
    pub fn single(seq: u64) -> Self {
        Self {
            first: seq,
            last: seq,
        }
    }

    pub fn span(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    /// True if `other` lies inside this range and is not this range itself
    pub fn supersedes(&self, other: &SegmentId) -> bool {
        self != other && self.first <= other.first && other.last <= self.last
    }

    /// File name for this segment
    /// (1,1) → "segment_000001.sst", (1,5) → "segment_000001-000005.sst"
    pub fn file_name(&self) -> String {
        if self.first == self.last {
            format!("segment_{:06}.sst", self.last)
        } else {
            format!("segment_{:06}-{:06}.sst", self.first, self.last)
        }
    }

    /// Parse a segment file name produced by `file_name`
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_prefix("segment_")?.strip_suffix(".sst")?;
        match stem.split_once('-') {
            Some((first, last)) => {
                let id = Self::span(first.parse().ok()?, last.parse().ok()?);
                (id.first <= id.last).then_some(id)
            }
            None => Some(Self::single(stem.parse().ok()?)),
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "#{}", self.last)
        } else {
            write!(f, "#{}-{}", self.first, self.last)
        }
    }
}

/// Load state of a segment's contents
enum LoadState {
    Unloaded,
    Loaded(Arc<SSTableReader>),
    Quarantined(String),
}

/// One segment file known to the catalog
pub struct Segment {
    id: SegmentId,
    path: PathBuf,
    state: Mutex<LoadState>,
    /// Set when compaction has replaced this segment
    obsolete: AtomicBool,
}

impl Segment {
    /// A segment whose contents will be read on first use
    pub(crate) fn unloaded(id: SegmentId, path: PathBuf) -> Self {
        Self {
            id,
            path,
            state: Mutex::new(LoadState::Unloaded),
            obsolete: AtomicBool::new(false),
        }
    }

    /// A segment whose verified contents are already in memory
    pub(crate) fn loaded(id: SegmentId, reader: SSTableReader) -> Self {
        Self {
            id,
            path: reader.path().to_path_buf(),
            state: Mutex::new(LoadState::Loaded(Arc::new(reader))),
            obsolete: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and verify the contents, or return the cached copy
    ///
    /// A segment that fails verification is quarantined: this call returns
    /// `CorruptSegment` and later calls return it again without touching the
    /// file.
    pub fn load(&self) -> Result<Arc<SSTableReader>> {
        let mut state = self.state.lock();
        match &*state {
            LoadState::Loaded(reader) => return Ok(Arc::clone(reader)),
            LoadState::Quarantined(reason) => {
                return Err(StrataError::corrupt(&self.path, reason.clone()))
            }
            LoadState::Unloaded => {}
        }

        match SSTableReader::open(&self.path) {
            Ok(reader) => {
                let reader = Arc::new(reader);
                *state = LoadState::Loaded(Arc::clone(&reader));
                tracing::debug!(
                    segment = %self.id,
                    entries = reader.entry_count(),
                    "loaded segment"
                );
                Ok(reader)
            }
            Err(StrataError::CorruptSegment { path, reason }) => {
                tracing::warn!(
                    segment = %self.id,
                    path = %path.display(),
                    %reason,
                    "quarantining corrupt segment"
                );
                *state = LoadState::Quarantined(reason.clone());
                Err(StrataError::CorruptSegment { path, reason })
            }
            Err(e) => Err(e),
        }
    }

    /// True once the segment has failed verification
    pub fn is_quarantined(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Quarantined(_))
    }

    /// True if the contents are cached in memory
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Loaded(_))
    }

    /// Schedule the file for removal once the last reference is dropped
    pub(crate) fn mark_obsolete(&self) {
        self.obsolete.store(true, Ordering::SeqCst);
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("obsolete", &self.is_obsolete())
            .finish()
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if !self.obsolete.load(Ordering::SeqCst) {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(segment = %self.id, "deleted obsolete segment file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                segment = %self.id,
                path = %self.path.display(),
                error = %e,
                "failed to delete obsolete segment file"
            ),
        }
    }
}
