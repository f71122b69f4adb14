//! In-memory value store for testing.

use crate::error::StorageResult;
use crate::store::ValueStore;
use std::collections::BTreeMap;

/// An in-memory value store.
///
/// Suitable for unit tests and for replays whose results do not need to
/// outlive the process.
///
/// # Example
///
/// ```rust
/// use ccreplay_storage::{InMemoryStore, ValueStore};
///
/// let store = InMemoryStore::with_values([("X", 7)]);
/// assert_eq!(store.read("X").unwrap(), 7);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: BTreeMap<String, u64>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing values.
    #[must_use]
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns a copy of every stored value.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.values.clone()
    }
}

impl ValueStore for InMemoryStore {
    fn read(&self, item: &str) -> StorageResult<u64> {
        Ok(self.values.get(item).copied().unwrap_or(0))
    }

    fn write(&mut self, item: &str, value: u64) -> StorageResult<()> {
        self.values.insert(item.to_string(), value);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing is buffered
        Ok(())
    }

    fn items(&self) -> StorageResult<Vec<String>> {
        Ok(self.values.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_missing_item_reads_zero() {
        let store = InMemoryStore::new();
        assert_eq!(store.read("A").unwrap(), 0);
        assert!(store.items().unwrap().is_empty());
    }

    #[test]
    fn memory_write_then_read() {
        let mut store = InMemoryStore::new();
        store.write("A", 10).unwrap();
        store.write("A", 11).unwrap();
        assert_eq!(store.read("A").unwrap(), 11);
    }

    #[test]
    fn memory_items_are_sorted() {
        let mut store = InMemoryStore::new();
        store.write("B", 1).unwrap();
        store.write("A", 2).unwrap();
        assert_eq!(store.items().unwrap(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn memory_with_values() {
        let store = InMemoryStore::with_values([("X", 3), ("Y", 4)]);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("X"), Some(&3));
        assert_eq!(snapshot.get("Y"), Some(&4));
    }

    #[test]
    fn memory_snapshot_sees_writes() {
        let mut store = InMemoryStore::with_values([("X", 3)]);
        store.write("X", 8).unwrap();
        store.write("Y", 1).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("X"), Some(&8));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn memory_flush_succeeds() {
        let mut store = InMemoryStore::new();
        store.write("A", 1).unwrap();
        assert!(store.flush().is_ok());
    }
}
