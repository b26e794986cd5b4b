//! A [`KeyValueStore`] backed by files on disk.

use crate::{KeyValueStore, StorageError};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;

/// The directory name used under the platform cache directory.
const DEFAULT_DIR_NAME: &str = "bridge-rpc";

lazy_static::lazy_static! {
    /// Per-file locks shared by every [`FileStore`] in the process.
    static ref FILE_LOCKS: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> = Mutex::default();
}

/// Returns the lock guarding writes to `path`.
fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    FILE_LOCKS.lock().entry(path.to_path_buf()).or_default().clone()
}

/// A [`KeyValueStore`] storing each key as a file inside a directory.
///
/// Writes go to a temporary file in the same directory which is then renamed over the
/// target, so readers never observe a partially written value. Writes to the same file are
/// serialized across all [`FileStore`]s of the process; other processes are not
/// coordinated with.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a [`FileStore`] rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns a [`FileStore`] rooted at the platform cache directory, e.g.
    /// `~/.cache/bridge-rpc` on Linux.
    ///
    /// Returns `None` if the platform has no cache directory.
    pub fn default_location() -> Option<Self> {
        dirs::cache_dir().map(|dir| Self::new(dir.join(DEFAULT_DIR_NAME)))
    }

    /// Returns the root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file holding `key`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so that namespaced keys such as
    /// `bridge-rpc:tx-receipts-cache` map to portable file names.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn read(path: &Path) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, path: &Path, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::read(&self.path_for(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let lock = file_lock(&path);
        let _guard = lock.lock();
        self.write(&path, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let lock = file_lock(&path);
        let _guard = lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let lock = file_lock(&path);
        let _guard = lock.lock();
        if let Some(value) = f(Self::read(&path)?) {
            self.write(&path, &value)?;
        }
        Ok(())
    }
}
