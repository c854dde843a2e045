//! Durable key/value storage for the session token and user profile

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::AuthError;

/// Key under which the bearer token is persisted
pub const TOKEN_KEY: &str = "token";

/// Key under which the JSON-serialized user profile is persisted
pub const USER_KEY: &str = "usuario";

/// Minimal local-storage style interface used by [`crate::SessionContext`]
pub trait SessionStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Remove `key`; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<(), AuthError>;
}

/// Storage kept in a single JSON object on disk
///
/// The file is created on the first write, including missing parent
/// directories. Every operation re-reads the file so that separate
/// processes sharing the path observe each other's logout.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, AuthError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::StorageError(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Like `load`, but an unreadable JSON document counts as empty so the
    /// next write replaces it; the flag reports whether that happened
    fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool), AuthError> {
        match self.load() {
            Ok(items) => Ok((items, false)),
            Err(AuthError::SerializationError(e)) => {
                log::warn!("Replacing unreadable {}: {}", self.path.display(), e);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    AuthError::StorageError(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(items)?;
        let write_error = |e: io::Error| {
            AuthError::StorageError(format!("failed to write {}: {}", self.path.display(), e))
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).map_err(write_error)?;
        // mode() only applies on creation
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(write_error)?;
        file.write_all(content.as_bytes()).map_err(write_error)
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let (mut items, _) = self.load_for_write()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let (mut items, corrupt) = self.load_for_write()?;
        if items.remove(key).is_some() || corrupt {
            self.save(&items)?;
        }
        Ok(())
    }
}

/// In-process storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        let items = self.items.lock().unwrap_or_else(|p| p.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut items = self.items.lock().unwrap_or_else(|p| p.into_inner());
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let mut items = self.items.lock().unwrap_or_else(|p| p.into_inner());
        items.remove(key);
        Ok(())
    }
}
