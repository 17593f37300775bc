//! WAL Writer
//!
//! Handles appending records to the WAL file and truncating its prefix once
//! a flush has made it redundant.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StrataError};
use crate::record::KeyValue;
use crate::storage::sync_dir;

use super::entry;

/// Writes records to the WAL file
///
/// Every method that touches the file takes `&mut self`, so an append can
/// never interleave with a truncation.
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Append-mode handle; `None` after a truncation lost it
    file: Option<File>,

    /// Current length of the log (the write cursor)
    position: u64,

    /// Last offset proven durable by a completed flush (in memory only)
    watermark: u64,

    sync_strategy: WalSyncStrategy,

    /// Records appended since the last fsync
    unsynced: usize,
}

impl WalWriter {
    /// Open or create a WAL file, positioned at its end
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = Self::open_append(path)?;
        let position = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            position,
            watermark: 0,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a record to the WAL
    ///
    /// Returns the log offset just past the new record.
    pub fn append(&mut self, record: &KeyValue) -> Result<u64> {
        let buf = entry::encode(record)?;
        self.handle()?.write_all(&buf)?;
        self.position += buf.len() as u64;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }

        tracing::trace!(
            op = %record.operation,
            key_len = record.key.len(),
            position = self.position,
            "appended WAL record"
        );
        Ok(self.position)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.handle()?.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Record the offset up to which the log is captured in a durable segment
    pub fn set_watermark(&mut self, position: u64) -> Result<()> {
        if position > self.position {
            return Err(StrataError::InvalidArgument(format!(
                "watermark {} is past the end of the WAL ({} bytes)",
                position, self.position
            )));
        }
        self.watermark = position;
        Ok(())
    }

    /// Discard the log prefix `[0, position)`
    ///
    /// The retained tail is written to a temporary file which is fsynced and
    /// renamed over the log, so a crash leaves either the old or the new log.
    pub fn truncate(&mut self, position: u64) -> Result<()> {
        if position > self.position {
            return Err(StrataError::InvalidArgument(format!(
                "cannot truncate WAL at {}, log is {} bytes",
                position, self.position
            )));
        }
        if position == 0 {
            return Ok(());
        }

        self.sync()?;

        if position == self.position {
            // Nothing to keep: cut the file in place
            self.handle()?.set_len(0)?;
            self.discard_prefix(position);
            self.handle()?.sync_all()?;
        } else {
            let mut tail = Vec::with_capacity((self.position - position) as usize);
            {
                let mut source = File::open(&self.path)?;
                source.seek(SeekFrom::Start(position))?;
                source.read_to_end(&mut tail)?;
            }

            let tmp_path = self.tmp_path();
            {
                let mut tmp = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&tmp_path)?;
                tmp.write_all(&tail)?;
                tmp.sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;

            // The old handle points at the unlinked log from here on
            self.file = None;
            self.discard_prefix(position);
            self.file = Some(Self::open_append(&self.path)?);

            if let Some(dir) = self.path.parent() {
                sync_dir(dir)?;
            }
        }

        tracing::debug!(
            discarded = position,
            retained = self.position,
            "truncated WAL prefix"
        );
        Ok(())
    }

    /// Current length of the log
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Last recorded watermark
    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shift the cursor and watermark once `[0, position)` is gone from disk
    fn discard_prefix(&mut self, position: u64) {
        self.position -= position;
        self.watermark = self.watermark.saturating_sub(position);
    }

    /// The append handle, reopened if a truncation lost it
    fn handle(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let file = Self::open_append(&self.path).map_err(|e| {
                tracing::error!(error = %e, "WAL handle lost after truncation");
                e
            })?;
            self.file = Some(file);
        }
        self.file.as_mut().ok_or_else(|| {
            StrataError::Io(io::Error::new(io::ErrorKind::NotFound, "WAL handle unavailable"))
        })
    }

    fn open_append(path: &Path) -> Result<File> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
