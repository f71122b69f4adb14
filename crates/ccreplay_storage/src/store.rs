//! Value store trait definition.

use crate::error::StorageResult;

/// A store holding one unsigned integer per data item.
///
/// Stores are **opaque value holders**. The replay engine decides when
/// values are read and written; stores only persist them.
///
/// # Invariants
///
/// - `read` of an item that was never written returns `0`
/// - `read` after `write(item, v)` returns `v`
/// - `flush` makes every previous write durable for persistent stores
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait ValueStore: Send + Sync {
    /// Reads the current value of `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item name is unusable or an I/O error occurs.
    fn read(&self, item: &str) -> StorageResult<u64>;

    /// Replaces the value of `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item name is unusable or an I/O error occurs.
    fn write(&mut self, item: &str, value: u64) -> StorageResult<()>;

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the names of every item that currently holds a value, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be produced.
    fn items(&self) -> StorageResult<Vec<String>>;
}
