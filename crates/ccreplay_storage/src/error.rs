//! Error types for value store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The data item name cannot be mapped onto the store.
    #[error("invalid data item name: {item:?}")]
    InvalidItem {
        /// The rejected item name.
        item: String,
    },

    /// A stored value could not be decoded.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store directory.
    #[error("store locked: another process has exclusive access")]
    Locked,
}

impl StorageError {
    /// Creates an invalid item error.
    pub fn invalid_item(item: impl Into<String>) -> Self {
        Self::InvalidItem { item: item.into() }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
