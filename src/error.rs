//! Error types for StrataKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Outcomes
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt segment {}: {reason}", path.display())]
    CorruptSegment { path: PathBuf, reason: String },

    #[error("Invalid operation tag: {0:#04x}")]
    InvalidOperation(u8),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StrataError::CorruptSegment {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the expected "no such key" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, StrataError::KeyNotFound)
    }

    /// True when a segment failed verification
    pub fn is_corrupt_segment(&self) -> bool {
        matches!(self, StrataError::CorruptSegment { .. })
    }
}
