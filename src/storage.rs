//! Key-value persistence substrate.
//!
//! Everything the engine persists goes through [`KeyValueStore`]: the two
//! record collections and one key per live dedup marker. Values are strings
//! (JSON documents in practice).

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::Result;

/// A string-to-string store scoped to one user profile.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
    /// Lists every key currently stored.
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-process store, lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Store backed by a single JSON object file.
///
/// The file is re-read on every access so that several processes of the same
/// profile (a `watch` loop and one-shot commands) observe each other's writes.
/// Every read-modify-write holds an exclusive advisory lock on a sibling
/// `.lock` file, and writes go to a temp file that is renamed into place.
/// A file that cannot be parsed is moved aside to `<name>.corrupt`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the store at [`FileStore::default_path`].
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    /// Returns the path to the store file (`store.json`).
    ///
    /// The path is determined in the following order:
    /// 1. `REMINDERS_DB` environment variable.
    /// 2. `~/.local/share/quick-reminders/store.json` (on Linux).
    /// 3. `./store.json` (fallback).
    pub fn default_path() -> PathBuf {
        std::env::var("REMINDERS_DB").map(PathBuf::from).unwrap_or_else(|_| {
            match dirs::data_local_dir() {
                Some(mut p) => {
                    p.push("quick-reminders");
                    p.push("store.json");
                    p
                }
                None => PathBuf::from("store.json"),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the store file.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Where an unparsable store file is moved to.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<StoreLock> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("lock"))?;
        file.lock_exclusive()?;
        Ok(StoreLock { file })
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let _lock = self.lock()?;
        let mut map = self.read_map()?;
        if f(&mut map) {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                let aside = self.corrupt_path();
                warn!("malformed store file {}: {e}; moving it to {}", self.path.display(), aside.display());
                if let Err(e) = fs::rename(&self.path, &aside) {
                    warn!("cannot move malformed store file aside: {e}");
                }
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("wrote {} keys to {}", map.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.modify(|map| map.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

/// Held for the duration of one read-modify-write.
struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("cannot release store lock: {e}");
        }
    }
}
