//! Segment Catalog
//!
//! Keeps the ordered set of live segments and publishes new ones.
//!
//! ## Responsibilities
//! - Discover existing segments on startup and clean up crash leftovers
//! - Search segments newest → oldest for reads
//! - Write, verify and publish segments produced by flush and compaction
//! - Swap compaction inputs for their merged output in one step

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, StrataError};
use crate::record::KeyValue;

use super::segment::{Segment, SegmentId};
use super::sstable::{SSTable, SSTableReader};
use super::sync_dir;

/// Suffix of a segment file that is still being written
const TMP_SUFFIX: &str = ".tmp";

/// In-memory catalog of segment files
///
/// ## Concurrency:
/// - `segments`: Protected by RwLock, ordered oldest → newest
/// - `next_seq`: Atomic counter (lock-free)
/// - Readers clone a snapshot of `Arc<Segment>`s and read without the lock
pub struct SegmentCatalog {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Live segments, ascending by `id.last`
    segments: RwLock<Vec<Arc<Segment>>>,

    /// Next sequence number for a flushed segment
    next_seq: AtomicU64,

    /// Read new files back before publishing them
    verify: bool,
}

impl SegmentCatalog {
    /// Open or create the catalog in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove `.tmp` files left by interrupted writes
    /// 3. Discover segment files
    /// 4. Remove segments superseded by a completed compaction
    /// 5. Order by sequence number (oldest first)
    pub fn open(dir: &Path, verify: bool) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut ids: Vec<SegmentId> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }
            let Some(name) = file_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name.ends_with(TMP_SUFFIX) {
                tracing::info!(file = name, "removing unfinished segment file");
                fs::remove_file(&file_path)?;
                continue;
            }
            if let Some(id) = SegmentId::parse(name) {
                ids.push(id);
            }
        }

        // A merged segment whose inputs are still on disk means compaction
        // stopped between publishing the merge and deleting the inputs.
        let superseded: Vec<SegmentId> = ids
            .iter()
            .filter(|id| ids.iter().any(|other| other.supersedes(id)))
            .copied()
            .collect();
        for id in &superseded {
            tracing::info!(segment = %id, "removing segment superseded by compaction");
            fs::remove_file(dir.join(id.file_name()))?;
        }
        ids.retain(|id| !superseded.contains(id));
        ids.sort_by_key(|id| id.last);

        let next_seq = ids.last().map(|id| id.last + 1).unwrap_or(1);
        let segments = ids
            .iter()
            .map(|id| Arc::new(Segment::unloaded(*id, dir.join(id.file_name()))))
            .collect::<Vec<_>>();

        tracing::debug!(
            dir = %dir.display(),
            segments = segments.len(),
            next_seq,
            "opened segment catalog"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            segments: RwLock::new(segments),
            next_seq: AtomicU64::new(next_seq),
            verify,
        })
    }

    /// Look up a key across all segments, newest → oldest
    ///
    /// Returns:
    /// - `Ok(Some(record))`: newest record for the key (may be a tombstone)
    /// - `Ok(None)`: no readable segment holds the key
    ///
    /// A segment that fails verification is quarantined and the error is
    /// returned; quarantined segments are skipped afterwards.
    pub fn lookup(&self, key: &[u8]) -> Result<Option<KeyValue>> {
        for segment in self.snapshot().iter().rev() {
            if segment.is_quarantined() {
                continue;
            }
            let reader = segment.load()?;
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(record) = reader.get(key) {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    /// Loaded contents of every readable segment, oldest → newest
    pub fn load_all(&self) -> Result<Vec<Arc<SSTableReader>>> {
        self.snapshot()
            .iter()
            .filter(|segment| !segment.is_quarantined())
            .map(|segment| segment.load())
            .collect()
    }

    /// Write `entries` as a new newest segment and publish it
    pub fn create_segment(&self, entries: Vec<KeyValue>) -> Result<Arc<Segment>> {
        // Generate new sequence number (atomic, lock-free)
        let id = SegmentId::single(self.next_seq.fetch_add(1, Ordering::SeqCst));
        let segment = Arc::new(self.write_segment(id, entries)?);

        let mut segments = self.segments.write();
        segments.push(Arc::clone(&segment));
        // Concurrent flushes may publish out of allocation order
        segments.sort_by_key(|s| s.id().last);

        Ok(segment)
    }

    /// Replace `inputs` with one segment holding `entries`
    ///
    /// The merged file is durable and verified before the catalog changes.
    /// The inputs are marked obsolete; each file goes away when the last
    /// reference to its segment is dropped.
    pub fn replace_segments(
        &self,
        inputs: &[Arc<Segment>],
        entries: Vec<KeyValue>,
    ) -> Result<Arc<Segment>> {
        let first = inputs.iter().map(|s| s.id().first).min();
        let last = inputs.iter().map(|s| s.id().last).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Err(StrataError::Storage(
                "compaction needs at least one input segment".to_string(),
            ));
        };

        let merged = Arc::new(self.write_segment(SegmentId::span(first, last), entries)?);

        {
            let mut segments = self.segments.write();
            let before = segments.len();
            segments.retain(|s| !inputs.iter().any(|input| Arc::ptr_eq(s, input)));
            if before - segments.len() != inputs.len() {
                return Err(StrataError::Storage(
                    "compaction inputs changed while merging".to_string(),
                ));
            }
            segments.push(Arc::clone(&merged));
            segments.sort_by_key(|s| s.id().last);
        }

        for input in inputs {
            input.mark_obsolete();
        }

        Ok(merged)
    }

    /// Current segments, oldest → newest
    pub fn snapshot(&self) -> Vec<Arc<Segment>> {
        self.segments.read().clone()
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Get the segment directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the next sequence number (for testing/debugging)
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write to `<name>.tmp`, fsync, rename into place, verify
    fn write_segment(&self, id: SegmentId, entries: Vec<KeyValue>) -> Result<Segment> {
        let path = self.dir.join(id.file_name());
        let tmp_path = self.dir.join(format!("{}{}", id.file_name(), TMP_SUFFIX));

        let written = match SSTable::write(&tmp_path, entries) {
            Ok(table) => table,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        fs::rename(&tmp_path, &path)?;
        sync_dir(&self.dir)?;

        let reader = if self.verify {
            let reader = SSTableReader::open(&path)
                .and_then(|reader| Self::check_written(&written, reader, &path));
            match reader {
                Ok(reader) => Some(reader),
                Err(e) => {
                    tracing::error!(segment = %id, error = %e, "segment failed read-back verification");
                    let _ = fs::remove_file(&path);
                    return Err(e);
                }
            }
        } else {
            None
        };

        tracing::info!(
            segment = %id,
            entries = written.entry_count,
            bytes = written.file_size,
            "wrote segment"
        );

        Ok(match reader {
            Some(reader) => Segment::loaded(id, reader),
            None => Segment::unloaded(id, path),
        })
    }

    fn check_written(written: &SSTable, reader: SSTableReader, path: &Path) -> Result<SSTableReader> {
        if reader.checksum() != written.checksum
            || reader.entry_count() != written.entry_count as usize
        {
            return Err(StrataError::corrupt(
                path,
                "read-back does not match what was written",
            ));
        }
        Ok(reader)
    }
}
