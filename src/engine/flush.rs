//! Flush controller
//!
//! Moves memtable contents into a new durable segment, then advances the
//! WAL watermark and discards the log prefix the segment now covers.
//!
//! Ordering: segment durable and verified → published in the catalog →
//! entries detached from the memtable → WAL truncated. A crash at any point
//! leaves every acknowledged write in the WAL, in a segment, or both.

use crate::error::Result;
use crate::storage::SegmentId;

use super::Engine;

/// Summary of one completed flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// The new segment
    pub segment: SegmentId,
    /// Entries written (tombstones included)
    pub entries: usize,
    /// Entries detached from the memtable; lower than `entries` when keys
    /// were rewritten during the flush
    pub detached: usize,
    /// WAL offset captured at flush start
    pub watermark: u64,
}

impl Engine {
    /// Flush the memtable to a new segment
    ///
    /// Returns `Ok(None)` when the memtable is empty. Writes arriving while
    /// the segment is written go on in parallel; they stay in the memtable
    /// and in the retained WAL tail.
    pub fn flush(&self) -> Result<Option<FlushReport>> {
        let _flushing = self.flush_lock.lock();

        // Step 1: Snapshot the memtable and the WAL offset it corresponds to
        let (snapshot, watermark) = {
            let state = self.state.lock();
            if state.memtable.is_empty() {
                return Ok(None);
            }
            (state.memtable.snapshot(), state.wal.position())
        };
        let entries = snapshot.len();

        // Step 2: Write, verify and publish the segment
        let segment = self.catalog.create_segment(snapshot.clone())?;

        // Step 3: Detach flushed entries, then drop the WAL prefix
        let detached = {
            let mut state = self.state.lock();
            let detached = state.memtable.remove_flushed(&snapshot);
            state.wal.set_watermark(watermark)?;
            state.wal.truncate(watermark)?;
            detached
        };

        tracing::info!(
            segment = %segment.id(),
            entries,
            detached,
            watermark,
            "flushed memtable"
        );

        Ok(Some(FlushReport {
            segment: segment.id(),
            entries,
            detached,
            watermark,
        }))
    }
}
