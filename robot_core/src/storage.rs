//! # Durable Storage
//!
//! The parameter store persists through a plain string key-value interface.
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`] - in-process map, for tests and throwaway sessions
//! - [`FileStorage`] - one JSON document per key in a directory, written
//!   atomically (temp file, fsync, rename) under an OS-level lock
//!
//! ## Example
//!
//! ```rust,no_run
//! use robot_core::storage::{FileStorage, Storage};
//!
//! let storage = FileStorage::open("/tmp/robot-session")?;
//! storage.set("robot_parameters", "{}")?;
//! assert_eq!(storage.get("robot_parameters")?.as_deref(), Some("{}"));
//! # Ok::<(), robot_core::errors::RobotError>(())
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::errors::{RobotError, RobotResult};

/// Key-value persistence used by the parameter store.
pub trait Storage {
    /// Read the value stored under `key`, `None` if nothing was stored.
    fn get(&self, key: &str) -> RobotResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> RobotResult<()>;
}

/// Non-persistent storage backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Storage pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = MemoryStorage::new();
        storage.entries.borrow_mut().insert(key.into(), value.into());
        storage
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> RobotResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RobotResult<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed storage, one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    pub fn open(root: impl AsRef<Path>) -> RobotResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            RobotError::storage("create directory", root.display().to_string(), e.to_string())
        })?;
        Ok(FileStorage { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> RobotResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(RobotError::storage("resolve key", key, "Keys may only contain [A-Za-z0-9_.-]"));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> RobotResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(RobotError::storage("read", key, e.to_string())),
        }
    }

    /// Atomic write:
    /// 1. Take an exclusive lock on `<key>.json.lock`
    /// 2. Write to `<key>.json.tmp` and fsync
    /// 3. Rename over `<key>.json`
    fn set(&self, key: &str, value: &str) -> RobotResult<()> {
        let path = self.path_for(key)?;
        let lock_path = path.with_extension("json.lock");
        let tmp_path = path.with_extension("json.tmp");

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| RobotError::storage("create lock", key, e.to_string()))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| RobotError::storage("lock", key, "Locked by another process"))?;

        let result = write_atomically(&tmp_path, &path, value)
            .map_err(|(operation, reason)| RobotError::storage(operation, key, reason));

        let _ = fs2::FileExt::unlock(&lock_file);
        result
    }
}

fn write_atomically(tmp_path: &Path, path: &Path, value: &str) -> Result<(), (&'static str, String)> {
    let mut tmp_file = File::create(tmp_path).map_err(|e| ("create temp file", e.to_string()))?;
    tmp_file
        .write_all(value.as_bytes())
        .map_err(|e| ("write temp file", e.to_string()))?;
    tmp_file.sync_all().map_err(|e| ("sync temp file", e.to_string()))?;

    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        ("rename to final", e.to_string())
    })
}
