//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{Result, StrataError};
use crate::record::KeyValue;

use super::WalReader;

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Number of records skipped because of an unknown op tag
    pub entries_invalid: u64,

    /// Bytes of torn record cut off the end of the log
    pub bytes_truncated: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover records from a WAL file
    ///
    /// This will:
    /// 1. Read all valid records in log order
    /// 2. Skip records with an unknown operation tag
    /// 3. Truncate a partial write at the end
    pub fn recover(path: &Path) -> Result<(Vec<KeyValue>, RecoveryResult)> {
        let (records, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                bytes = result.bytes_truncated,
                offset = valid_len,
                "removed torn record from end of WAL"
            );
        }

        Ok((records, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<KeyValue>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut records = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    records.push(record);
                    result.entries_recovered += 1;
                }
                Ok(None) => break,
                Err(StrataError::InvalidOperation(tag)) => {
                    tracing::warn!(
                        tag,
                        offset = reader.offset(),
                        "skipping WAL record with invalid operation"
                    );
                    result.entries_invalid += 1;
                }
                Err(StrataError::WalCorruption(_)) => {
                    result.was_truncated = true;
                    result.bytes_truncated = reader.len() - reader.offset();
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((records, result, reader.offset()))
    }
}
