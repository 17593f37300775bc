//! # StrataKV
//!
//! A single-node, log-structured key-value store with:
//! - Write-Ahead Logging (WAL) before every in-memory mutation
//! - Immutable, sorted, CRC32-checked segment files
//! - Flushes that truncate the WAL only after the segment is verified
//! - Compaction under a segment-count ceiling, collapsing tombstones
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Request layer (Command/Response)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Engine                              │
//! │              (one lock over WAL + MemTable)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │ (BTreeMap)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌───────────────┐    ┌───────────┐
//!                           │ SegmentCatalog│◄───│ Compactor │
//!                           │  (SSTables)   │    └───────────┘
//!                           └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod record;

pub mod engine;
pub mod memtable;
pub mod protocol;
pub mod scheduler;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, WalSyncStrategy};
pub use engine::{Engine, FlushReport};
pub use error::{Result, StrataError};
pub use record::{KeyValue, Operation};
pub use scheduler::Scheduler;
pub use storage::CompactionReport;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
