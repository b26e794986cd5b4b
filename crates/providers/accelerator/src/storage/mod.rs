//! Persistent key-value storage backing the receipt cache.

use crate::StorageError;
use std::fmt::Debug;

mod memory;
pub use memory::MemoryStore;

mod file;
pub use file::FileStore;

/// A synchronous string key-value store.
///
/// Implementations must be safe to share across threads. Handles to the same underlying
/// storage, including separate store instances, must serialize [`KeyValueStore::update`]
/// against each other.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None` if the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Atomically replaces the value stored under `key`.
    ///
    /// `f` receives the current value and returns the value to store, or `None` to leave
    /// the key untouched. No other `update` of the same key runs between the read and the
    /// write. A failed read returns the error without calling `f` or writing anything.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError>;
}
