//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Track entry count and size for flush triggers
//! - Ordered snapshots for segment creation
//! - Detach exactly the entries a flush made durable
//!
//! ## Data Structure Choice
//! A plain BTreeMap. The engine guards it together with the WAL writer under
//! one lock, so the table itself carries no synchronization.

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key still present in some segment)
    Tombstone,
}
