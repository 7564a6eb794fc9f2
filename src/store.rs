//! Persistent key/value storage for the session snapshot
//!
//! The auth layer keeps exactly three entries here: the access token, the
//! refresh token and the JSON encoded user. Anything implementing
//! [`SessionStore`] can back a client; [`MemoryStore`] lives for the process
//! and [`FileStore`] survives restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::warn;

use crate::error::Result;

/// Key holding the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key holding the JSON encoded logged in user
pub const USER_KEY: &str = "user";

/// All keys that make up an authenticated session
pub const AUTH_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// String key/value storage shared by the HTTP layer and the contexts
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Drop every auth entry. Every key is attempted; the first failure is
    /// reported afterwards.
    fn clear_auth(&self) -> Result<()> {
        let mut first_error = None;
        for key in AUTH_KEYS {
            if let Err(e) = self.remove(key) {
                warn!("failed to remove {} from the session store: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// In-memory store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// JSON file on disk holding a flat string map
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty when the file does not exist
    /// or cannot be parsed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("discarding unreadable session file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the map, write it, and only then make it
    /// the current state
    fn commit<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>) -> bool,
    {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        let mut next = values.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *values = next;
        Ok(())
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // replace the file atomically
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.commit(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.commit(|values| values.remove(key).is_some())
    }

    /// One write for all three keys
    fn clear_auth(&self) -> Result<()> {
        self.commit(|values| {
            let before = values.len();
            values.retain(|key, _| !AUTH_KEYS.contains(&key.as_str()));
            values.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_clear_auth() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "a").unwrap();
        store.set(REFRESH_TOKEN_KEY, "r").unwrap();
        store.set(USER_KEY, "{}").unwrap();
        store.set("theme", "dark").unwrap();

        store.clear_auth().unwrap();

        for key in AUTH_KEYS {
            assert_eq!(store.get(key), None);
        }
        assert_eq!(store.get("theme"), Some("dark".to_string()));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set(ACCESS_TOKEN_KEY, "abc").unwrap();
            store.set(USER_KEY, r#"{"id":1}"#).unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY), Some("abc".to_string()));
        reopened.remove(ACCESS_TOKEN_KEY).unwrap();

        let again = FileStore::open(&path).unwrap();
        assert_eq!(again.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(again.get(USER_KEY), Some(r#"{"id":1}"#.to_string()));
    }

    /// Memory store whose removals of one key always fail
    struct StuckKeyStore {
        inner: MemoryStore,
        stuck: &'static str,
    }

    impl SessionStore for StuckKeyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            if key == self.stuck {
                return Err(crate::error::Error::general("disk full"));
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_clear_auth_attempts_every_key() {
        let store = StuckKeyStore {
            inner: MemoryStore::new(),
            stuck: ACCESS_TOKEN_KEY,
        };
        for key in AUTH_KEYS {
            store.set(key, "x").unwrap();
        }

        let err = store.clear_auth().unwrap_err();

        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.get(ACCESS_TOKEN_KEY), Some("x".to_string()));
        assert_eq!(store.get(REFRESH_TOKEN_KEY), None);
        assert_eq!(store.get(USER_KEY), None);
    }

    #[test]
    fn test_file_store_failed_write_keeps_memory_and_disk_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        store.set(USER_KEY, "{}").unwrap();

        // a directory where the temporary file goes makes every write fail
        fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(store.set(REFRESH_TOKEN_KEY, "r").is_err());
        assert_eq!(store.get(REFRESH_TOKEN_KEY), None);
        assert!(store.remove(USER_KEY).is_err());
        assert!(store.clear_auth().is_err());
        assert_eq!(store.get(ACCESS_TOKEN_KEY), Some("abc".to_string()));
        assert_eq!(store.get(USER_KEY), Some("{}".to_string()));

        let on_disk = FileStore::open(&path).unwrap();
        for key in AUTH_KEYS {
            assert_eq!(on_disk.get(key), store.get(key), "{}", key);
        }

        fs::remove_dir(path.with_extension("tmp")).unwrap();
        store.clear_auth().unwrap();
        let cleared = FileStore::open(&path).unwrap();
        assert_eq!(cleared.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(cleared.get(USER_KEY), None);
    }

    #[test]
    fn test_file_store_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
    }
}
