//! MemTable implementation

use std::collections::BTreeMap;

use crate::record::{KeyValue, Operation};

use super::MemTableEntry;

/// Bookkeeping bytes charged per entry on top of key and value
const ENTRY_OVERHEAD: usize = 32;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Vec<u8>, MemTableEntry>,

    /// Approximate size in bytes
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key
    pub fn get(&self, key: &[u8]) -> Option<&MemTableEntry> {
        self.data.get(key)
    }

    /// Insert or overwrite a value; returns the new approximate size
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Replace the key with a tombstone; returns the new approximate size
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    /// Drop the key entirely
    pub fn remove(&mut self, key: &[u8]) -> Option<MemTableEntry> {
        let entry = self.data.remove(key)?;
        self.size -= Self::entry_size(key, &entry);
        Some(entry)
    }

    /// Apply a replayed WAL record
    pub fn apply(&mut self, record: KeyValue) {
        match record.operation {
            Operation::Set => self.put(record.key, record.value),
            Operation::Delete => self.delete(record.key),
        };
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get entry count (tombstones included)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate entries in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &MemTableEntry)> {
        self.data.iter()
    }

    /// Copy every entry as a record, sorted by key (tombstones as Delete)
    pub fn snapshot(&self) -> Vec<KeyValue> {
        self.data
            .iter()
            .map(|(key, entry)| match entry {
                MemTableEntry::Value(value) => KeyValue::set(key.clone(), value.clone()),
                MemTableEntry::Tombstone => KeyValue::tombstone(key.clone()),
            })
            .collect()
    }

    /// Remove the entries a flush wrote out
    ///
    /// Only entries still identical to their flushed record are removed; a
    /// key rewritten while the flush ran keeps its newer entry. Returns the
    /// number of entries removed.
    pub fn remove_flushed(&mut self, flushed: &[KeyValue]) -> usize {
        let mut removed = 0;
        for record in flushed {
            let unchanged = match (self.data.get(&record.key), record.operation) {
                (Some(MemTableEntry::Value(current)), Operation::Set) => *current == record.value,
                (Some(MemTableEntry::Tombstone), Operation::Delete) => true,
                _ => false,
            };
            if unchanged && self.remove(&record.key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    fn insert(&mut self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let added = Self::entry_size(&key, &entry);
        if let Some(old) = self.data.get(&key) {
            self.size -= Self::entry_size(&key, old);
        }
        self.data.insert(key, entry);
        self.size += added;
        self.size
    }

    fn entry_size(key: &[u8], entry: &MemTableEntry) -> usize {
        let value_len = match entry {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        };
        key.len() + value_len + ENTRY_OVERHEAD
    }
}
