//! File-per-item value store for persistent storage.
//!
//! ```text
//! <store_dir>/
//! ├─ LOCK        # Advisory lock for single-writer access
//! ├─ A.val       # Value of data item "A"
//! └─ B.val       # Value of data item "B"
//! ```
//!
//! Each value file holds the minimal big-endian encoding of the value.
//! An empty or missing file reads as zero.

use crate::error::{StorageError, StorageResult};
use crate::store::ValueStore;
use fs2::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const VALUE_EXTENSION: &str = "val";

/// A store that keeps one file per data item inside a directory.
///
/// The directory is locked for the lifetime of the store so two replays
/// cannot interleave writes to the same values.
///
/// # Example
///
/// ```no_run
/// use ccreplay_storage::{FileStore, ValueStore};
/// use std::path::Path;
///
/// let mut store = FileStore::open(Path::new("values")).unwrap();
/// store.write("A", 300).unwrap();
/// store.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    /// Items written since the last flush.
    dirty: BTreeSet<String>,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - Another process holds the lock (returns `Locked`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        Ok(Self {
            root: path.to_path_buf(),
            dirty: BTreeSet::new(),
            _lock_file: lock_file,
        })
    }

    /// Returns the number of items written since the last flush.
    #[must_use]
    pub fn unsynced(&self) -> usize {
        self.dirty.len()
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, item: &str) -> StorageResult<PathBuf> {
        let valid = !item.is_empty()
            && !item.starts_with('.')
            && item
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid || item == LOCK_FILE {
            return Err(StorageError::invalid_item(item));
        }
        Ok(self.root.join(format!("{item}.{VALUE_EXTENSION}")))
    }
}

impl ValueStore for FileStore {
    fn read(&self, item: &str) -> StorageResult<u64> {
        let path = self.item_path(item)?;
        match fs::read(&path) {
            Ok(bytes) => decode_value(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, item: &str, value: u64) -> StorageResult<()> {
        let path = self.item_path(item)?;
        fs::write(&path, encode_value(value))?;
        self.dirty.insert(item.to_string());
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let dirty = std::mem::take(&mut self.dirty);
        for item in dirty {
            let file = File::open(self.item_path(&item)?)?;
            file.sync_all()?;
        }
        Ok(())
    }

    fn items(&self) -> StorageResult<Vec<String>> {
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                items.push(stem.to_string());
            }
        }
        items.sort();
        Ok(items)
    }
}

/// Encodes a value as its minimal big-endian byte string.
///
/// Zero encodes as the empty string.
#[must_use]
pub fn encode_value(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Decodes a big-endian byte string written by [`encode_value`].
///
/// Leading zero bytes are accepted.
///
/// # Errors
///
/// Returns `Corrupted` if the significant bytes do not fit in a `u64`.
pub fn decode_value(bytes: &[u8]) -> StorageResult<u64> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > 8 {
        return Err(StorageError::corrupted(format!(
            "value of {} bytes does not fit in 64 bits",
            significant.len()
        )));
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn file_missing_item_reads_zero() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.read("A").unwrap(), 0);
    }

    #[test]
    fn file_write_then_read() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.write("A", 300).unwrap();
        store.flush().unwrap();
        assert_eq!(store.read("A").unwrap(), 300);
        assert_eq!(fs::read(dir.path().join("A.val")).unwrap(), vec![0x01, 0x2c]);
    }

    #[test]
    fn file_flush_clears_unsynced_items() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.write("A", 1).unwrap();
        store.write("B", 2).unwrap();
        store.write("A", 3).unwrap();
        assert_eq!(store.unsynced(), 2);
        store.flush().unwrap();
        assert_eq!(store.unsynced(), 0);
        assert_eq!(store.read("A").unwrap(), 3);
    }

    #[test]
    fn file_values_persist_across_open() {
        let dir = tempdir().unwrap();
        {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.write("X", 9).unwrap();
            store.flush().unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.read("X").unwrap(), 9);
        assert_eq!(store.items().unwrap(), vec!["X".to_string()]);
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _store = FileStore::open(dir.path()).unwrap();
        let result = FileStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::Locked)));
    }

    #[test]
    fn file_rejects_path_like_items() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        for item in ["", "../A", "a/b", ".hidden", "LOCK"] {
            assert!(matches!(
                store.write(item, 1),
                Err(StorageError::InvalidItem { .. })
            ));
        }
    }

    #[test]
    fn encode_zero_is_empty() {
        assert!(encode_value(0).is_empty());
        assert_eq!(decode_value(&[]).unwrap(), 0);
    }

    #[test]
    fn decode_accepts_leading_zeros() {
        assert_eq!(decode_value(&[0, 0, 0x01, 0x00]).unwrap(), 256);
    }

    #[test]
    fn decode_rejects_oversized_values() {
        let bytes = [1u8; 9];
        assert!(matches!(
            decode_value(&bytes),
            Err(StorageError::Corrupted(_))
        ));
    }

    proptest! {
        #[test]
        fn encoding_is_minimal(value in any::<u64>()) {
            let encoded = encode_value(value);
            prop_assert!(encoded.first().map_or(true, |&b| b != 0));
            prop_assert_eq!(decode_value(&encoded).unwrap(), value);
        }
    }
}
