//! Compaction
//!
//! Merges segments once their count exceeds a ceiling.
//!
//! ## Policy
//! Every segment newer than the newest quarantined one is merged into a
//! single segment. When the selection reaches back to the oldest segment,
//! tombstones have nothing left to hide and are dropped from the output.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::record::KeyValue;

use super::catalog::SegmentCatalog;
use super::segment::{Segment, SegmentId};

/// Summary of one completed compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    /// The segment that replaced the inputs
    pub merged: SegmentId,
    /// Segments merged away, oldest first
    pub inputs: Vec<SegmentId>,
    /// Entries read across all inputs
    pub entries_in: usize,
    /// Entries written to the merged segment
    pub entries_out: usize,
    /// Whether tombstones were collapsed
    pub dropped_tombstones: bool,
}

/// Runs compactions one at a time
pub struct Compactor {
    /// Segment count ceiling
    max_segments: usize,
    /// Held for the duration of a compaction
    running: Mutex<()>,
}

impl Compactor {
    pub fn new(max_segments: usize) -> Self {
        Self {
            max_segments,
            running: Mutex::new(()),
        }
    }

    /// Compact if the catalog holds more than `max_segments` segments
    ///
    /// Returns `Ok(None)` when nothing was done: under the ceiling, fewer than
    /// two selectable segments, or another compaction already running.
    pub fn maybe_compact(&self, catalog: &SegmentCatalog) -> Result<Option<CompactionReport>> {
        if catalog.segment_count() <= self.max_segments {
            return Ok(None);
        }
        self.compact(catalog)
    }

    /// Compact the selectable segments regardless of the ceiling
    pub fn compact(&self, catalog: &SegmentCatalog) -> Result<Option<CompactionReport>> {
        let Some(_running) = self.running.try_lock() else {
            tracing::debug!("compaction already running, skipping");
            return Ok(None);
        };

        let snapshot = catalog.snapshot();
        let (inputs, from_oldest) = select_inputs(&snapshot);
        if inputs.len() < 2 {
            return Ok(None);
        }

        // Load every input before anything changes; a corrupt input aborts
        // the compaction with all sources intact.
        let mut tables = Vec::with_capacity(inputs.len());
        for segment in &inputs {
            tables.push(segment.load()?);
        }

        let entries_in = tables.iter().map(|t| t.entry_count()).sum();
        let merged = merge(tables.iter().map(|t| t.entries()), from_oldest);
        let entries_out = merged.len();

        let segment = catalog.replace_segments(&inputs, merged)?;

        let report = CompactionReport {
            merged: segment.id(),
            inputs: inputs.iter().map(|s| s.id()).collect(),
            entries_in,
            entries_out,
            dropped_tombstones: from_oldest,
        };
        tracing::info!(
            merged = %report.merged,
            inputs = report.inputs.len(),
            entries_in,
            entries_out,
            "compaction finished"
        );
        Ok(Some(report))
    }

    pub fn max_segments(&self) -> usize {
        self.max_segments
    }
}

/// Segments after the newest quarantined one, and whether that is all of them
///
/// A corrupt segment that was never loaded is not quarantined yet. The first
/// run fails on it with `CorruptSegment` and quarantines it; the next run
/// merges around it.
fn select_inputs(snapshot: &[Arc<Segment>]) -> (Vec<Arc<Segment>>, bool) {
    match snapshot.iter().rposition(|s| s.is_quarantined()) {
        Some(bad) => (snapshot[bad + 1..].to_vec(), false),
        None => (snapshot.to_vec(), true),
    }
}

/// Merge entry lists given oldest → newest
///
/// For each key the entry from the newest list wins. With
/// `drop_tombstones`, keys whose winner is a Delete are left out. The output
/// is sorted ascending by key.
pub fn merge<'a, I>(tables: I, drop_tombstones: bool) -> Vec<KeyValue>
where
    I: IntoIterator<Item = &'a [KeyValue]>,
{
    let mut newest: BTreeMap<&'a [u8], &'a KeyValue> = BTreeMap::new();
    for table in tables {
        for entry in table {
            newest.insert(entry.key.as_slice(), entry);
        }
    }

    newest
        .into_values()
        .filter(|entry| !(drop_tombstones && entry.is_tombstone()))
        .cloned()
        .collect()
}
