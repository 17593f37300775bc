//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults. A `Config` can be built
//! in code through [`ConfigBuilder`] or loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, StrataError};

/// Main configuration for a StrataKV instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── segments/        (segment files)
    pub data_dir: PathBuf,

    /// Read every new segment back and verify its checksum before publishing it
    pub verify_segments: bool,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Live entry count above which a write triggers a flush
    pub memtable_entry_limit: usize,

    /// Approximate memtable size (in bytes) above which a write triggers a flush
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Background Task Configuration
    // -------------------------------------------------------------------------
    /// Seconds between scheduled flushes
    pub flush_interval_secs: u64,

    /// Seconds between scheduled compaction checks
    pub compaction_interval_secs: u64,

    /// Segment count ceiling; compaction runs once it is exceeded
    pub max_segments: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for WalSyncStrategy {
    fn default() -> Self {
        WalSyncStrategy::EveryWrite
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            verify_segments: true,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            memtable_entry_limit: 1000,
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            flush_interval_secs: 30 * 60,
            compaction_interval_secs: 30 * 60,
            max_segments: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a TOML file; missing fields take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| StrataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine misbehave
    pub fn validate(&self) -> Result<()> {
        if self.memtable_entry_limit == 0 {
            return Err(StrataError::Config(
                "memtable_entry_limit must be at least 1".to_string(),
            ));
        }
        if self.memtable_size_limit == 0 {
            return Err(StrataError::Config(
                "memtable_size_limit must be at least 1".to_string(),
            ));
        }
        if self.flush_interval_secs == 0 || self.compaction_interval_secs == 0 {
            return Err(StrataError::Config(
                "background intervals must be at least one second".to_string(),
            ));
        }
        if self.max_segments == 0 {
            return Err(StrataError::Config(
                "max_segments must be at least 1".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(StrataError::Config(
                "wal sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn compaction_interval(&self) -> Duration {
        Duration::from_secs(self.compaction_interval_secs)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the live entry count that triggers a flush
    pub fn memtable_entry_limit(mut self, count: usize) -> Self {
        self.config.memtable_entry_limit = count;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the scheduled flush interval (whole seconds)
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval_secs = interval.as_secs().max(1);
        self
    }

    /// Set the scheduled compaction interval (whole seconds)
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.config.compaction_interval_secs = interval.as_secs().max(1);
        self
    }

    /// Set the segment count ceiling
    pub fn max_segments(mut self, count: usize) -> Self {
        self.config.max_segments = count;
        self
    }

    /// Enable or disable read-back verification of new segments
    pub fn verify_segments(mut self, verify: bool) -> Self {
        self.config.verify_segments = verify;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
