//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Journal every mutation in the WAL before applying it in memory
//! - Resolve reads across the memtable and every segment
//! - Trigger flushes when the memtable is full
//! - Manage crash recovery on startup

mod flush;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::memtable::{MemTable, MemTableEntry};
use crate::protocol::{Command, Response};
use crate::record::{KeyValue, Operation};
use crate::storage::{CompactionReport, Compactor, SegmentCatalog};
use crate::wal::{WalRecovery, WalWriter, MAX_FIELD_LEN};

pub use flush::FlushReport;

/// State guarded by the engine's single write lock
struct WriteState {
    /// Write-ahead log
    wal: WalWriter,

    /// In-memory table for recent writes
    memtable: MemTable,
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// - **`state`** (memtable + WAL writer): one exclusive lock. `set`, `get`,
///   `del` and `get_all` hold it for their full duration, so the WAL and the
///   memtable can never diverge and a flush cannot move a key between the
///   memtable and the catalog while a read is resolving it.
/// - **`catalog`**: its own RwLock over `Arc<Segment>`s. Segment contents are
///   immutable once verified and are cached behind `Arc`s.
/// - **`flush_lock`**: serializes flushes. A flush holds `state` only to
///   snapshot the memtable and, afterwards, to detach what it wrote.
/// - **`compactor`**: runs at most one compaction at a time.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory holding segment files
    segment_dir: PathBuf,

    state: Mutex<WriteState>,

    /// Live segments
    catalog: SegmentCatalog,

    compactor: Compactor,

    flush_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SEGMENT_DIR: &'static str = "segments";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Open the segment catalog (cleans up interrupted flushes/compactions)
    /// 3. Replay the WAL into the memtable
    /// 4. Ready to serve requests
    ///
    /// The watermark is not persisted: the whole WAL is replayed, and the next
    /// flush captures and truncates it.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir)?;

        let segment_dir = config.data_dir.join(Self::SEGMENT_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let catalog = SegmentCatalog::open(&segment_dir, config.verify_segments)?;

        let mut memtable = MemTable::new();
        if wal_path.exists() {
            let (records, recovery) = WalRecovery::recover(&wal_path)?;
            for record in records {
                memtable.apply(record);
            }
            if recovery.entries_recovered > 0 || recovery.entries_invalid > 0 || recovery.was_truncated {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    invalid = recovery.entries_invalid,
                    truncated_bytes = recovery.bytes_truncated,
                    live_entries = memtable.len(),
                    "replayed WAL"
                );
            }
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            segments = catalog.segment_count(),
            "engine opened"
        );

        Ok(Self {
            compactor: Compactor::new(config.max_segments),
            config,
            segment_dir,
            state: Mutex::new(WriteState { wal, memtable }),
            catalog,
            flush_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a request-layer command
    ///
    /// `KeyNotFound` becomes `NotFound`, `InvalidArgument` becomes
    /// `BadRequest`, every other failure becomes `Error`.
    pub fn execute(&self, command: Command) -> Response {
        let result = match command {
            Command::Set { key, value } => self.set(&key, &value).map(|()| Response::Ok),
            Command::Get { key } => self.get(&key).map(Response::Value),
            Command::Del { key } => self.del(&key).map(Response::Deleted),
            Command::GetAll => self.get_all().map(Response::Entries),
        };
        result.unwrap_or_else(Response::from_error)
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the write lock
    /// 2. Write to WAL (durability)
    /// 3. Write to MemTable
    /// 4. Flush if the memtable grew past its limits
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_field(key, "key")?;
        validate_field(value, "value")?;

        let record = KeyValue::set(key, value);
        let needs_flush = {
            let mut state = self.state.lock();
            state.wal.append(&record)?;
            state.memtable.put(record.key, record.value);
            self.over_limit(&state.memtable)
        };

        if needs_flush {
            self.flush_after_write();
        }
        Ok(())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. Segments (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state.lock();

        if let Some(entry) = state.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(value.clone()),
                MemTableEntry::Tombstone => Err(StrataError::KeyNotFound),
            };
        }

        match self.catalog.lookup(key)? {
            Some(record) if record.operation == Operation::Set => Ok(record.value),
            _ => Err(StrataError::KeyNotFound),
        }
    }

    /// Delete a key, returning the value it held
    ///
    /// Steps:
    /// 1. Acquire the write lock
    /// 2. Resolve the current value (KeyNotFound if absent or deleted)
    /// 3. Write a Delete record carrying that value to the WAL
    /// 4. Replace the memtable entry with a tombstone
    ///
    /// The tombstone hides copies in existing segments and in a segment a
    /// concurrent flush may be about to publish; compaction collapses it.
    pub fn del(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.state.lock();

        let previous = match state.memtable.get(key) {
            Some(MemTableEntry::Value(value)) => value.clone(),
            Some(MemTableEntry::Tombstone) => return Err(StrataError::KeyNotFound),
            None => match self.catalog.lookup(key)? {
                Some(record) if record.operation == Operation::Set => record.value,
                _ => return Err(StrataError::KeyNotFound),
            },
        };

        state.wal.append(&KeyValue::delete(key, previous.clone()))?;
        state.memtable.delete(key.to_vec());

        let needs_flush = self.over_limit(&state.memtable);
        drop(state);

        if needs_flush {
            self.flush_after_write();
        }
        Ok(previous)
    }

    /// Every live key-value pair, sorted by key
    ///
    /// Segments are overlaid oldest → newest, then the memtable on top;
    /// tombstones hide older values and are left out of the result.
    pub fn get_all(&self) -> Result<Vec<KeyValue>> {
        let state = self.state.lock();

        let tables = self.catalog.load_all()?;
        let mut merged: BTreeMap<&[u8], Option<&[u8]>> = BTreeMap::new();
        for table in &tables {
            for entry in table.entries() {
                let value = (!entry.is_tombstone()).then_some(entry.value.as_slice());
                merged.insert(entry.key.as_slice(), value);
            }
        }
        for (key, entry) in state.memtable.iter() {
            let value = match entry {
                MemTableEntry::Value(v) => Some(v.as_slice()),
                MemTableEntry::Tombstone => None,
            };
            merged.insert(key.as_slice(), value);
        }

        Ok(merged
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| KeyValue::set(key, v)))
            .collect())
    }

    /// Compact segments if their count exceeds `max_segments`
    pub fn maybe_compact(&self) -> Result<Option<CompactionReport>> {
        self.compactor.maybe_compact(&self.catalog)
    }

    /// Compact segments regardless of the ceiling
    pub fn compact(&self) -> Result<Option<CompactionReport>> {
        self.compactor.compact(&self.catalog)
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs to disk
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.state.lock().wal.sync()?;
        tracing::info!("engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the directory where segments are stored
    pub fn segment_dir(&self) -> &Path {
        &self.segment_dir
    }

    /// Get the memtable entry count (tombstones included)
    pub fn memtable_len(&self) -> usize {
        self.state.lock().memtable.len()
    }

    /// Get the approximate memtable size in bytes
    pub fn memtable_size(&self) -> usize {
        self.state.lock().memtable.size()
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.catalog.segment_count()
    }

    /// Get the segment catalog
    pub fn catalog(&self) -> &SegmentCatalog {
        &self.catalog
    }

    /// Current WAL length in bytes
    pub fn wal_position(&self) -> u64 {
        self.state.lock().wal.position()
    }

    /// Current WAL watermark
    pub fn wal_watermark(&self) -> u64 {
        self.state.lock().wal.watermark()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn over_limit(&self, memtable: &MemTable) -> bool {
        memtable.len() > self.config.memtable_entry_limit
            || memtable.size() > self.config.memtable_size_limit
    }

    /// A write is acknowledged once it is in the WAL; a failed flush here is
    /// retried by the next trigger.
    fn flush_after_write(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "flush triggered by write failed");
        }
    }
}

fn validate_field(field: &[u8], name: &str) -> Result<()> {
    if field.is_empty() {
        return Err(StrataError::InvalidArgument(format!("{} must not be empty", name)));
    }
    if field.len() > MAX_FIELD_LEN {
        return Err(StrataError::InvalidArgument(format!(
            "{} is {} bytes, the limit is {}",
            name,
            field.len(),
            MAX_FIELD_LEN
        )));
    }
    Ok(())
}
