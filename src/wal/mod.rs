//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a record before any mutation is applied in memory
//! - Track the watermark proven durable by the last flush
//! - Discard the log prefix a flush has captured
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ Record 1                                              │
//! │ ┌────────┬────────────┬─────┬──────────────┬───────┐ │
//! │ │ Op (1) │ KeyLen (2) │ Key │ ValueLen (2) │ Value │ │
//! │ └────────┴────────────┴─────┴──────────────┴───────┘ │
//! ├───────────────────────────────────────────────────────┤
//! │ Record 2 ...                                          │
//! └───────────────────────────────────────────────────────┘
//! ```
//! Lengths are little-endian. Op is 0 for Set, 1 for Delete.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{decode, encode, encode_into, encoded_len, Decoded, HEADER_SIZE, MAX_FIELD_LEN};
pub use reader::WalReader;
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
