//! # ccreplay Storage
//!
//! Value stores for data items replayed by `ccreplay_core`.
//!
//! A store maps an opaque data item name to a single unsigned integer.
//! Stores know nothing about transactions, locks or validation; the
//! replay engine only touches them when an optimistic transaction that
//! passed validation applies its deferred work.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral replays
//! - [`FileStore`] - One file per data item inside a locked directory
//!
//! ## Example
//!
//! ```rust
//! use ccreplay_storage::{InMemoryStore, ValueStore};
//!
//! let mut store = InMemoryStore::new();
//! store.write("A", 42).unwrap();
//! assert_eq!(store.read("A").unwrap(), 42);
//! assert_eq!(store.read("B").unwrap(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::{decode_value, encode_value, FileStore};
pub use memory::InMemoryStore;
pub use store::ValueStore;
