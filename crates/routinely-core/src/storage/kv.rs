//! Generic key-value persistence.
//!
//! Small pieces of state (the running session, UI choices) are stored as
//! JSON strings under a key. Stores only implement the raw string
//! operations; typed access is provided on top.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, DatabaseError};

pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Returns whether the key was present.
    fn remove(&self, key: &str) -> Result<bool, CoreError>;

    fn contains(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Store `value` as JSON under `key`, replacing any previous value.
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CoreError>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value).map_err(|e| DatabaseError::EncodeFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_raw(key, &json)
    }

    /// Load the JSON value under `key`.
    ///
    /// # Errors
    /// A value that does not decode as `T` is a [`DatabaseError::CorruptedRecord`].
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError>
    where
        Self: Sized,
    {
        match self.get_raw(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                DatabaseError::CorruptedRecord {
                    key: key.to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.remove(key).map(|_| ())
    }

    fn exists(&self, key: &str) -> Result<bool, CoreError> {
        self.contains(key)
    }
}

/// In-process store, for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CoreError> {
        self.entries
            .lock()
            .map_err(|_| DatabaseError::Locked.into())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.entries()?.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        last_routine: String,
        count: u32,
    }

    #[test]
    fn typed_save_and_load() {
        let store = MemoryStore::new();
        let prefs = Prefs {
            last_routine: "r1".into(),
            count: 3,
        };
        store.save("prefs", &prefs).unwrap();
        assert!(store.exists("prefs").unwrap());
        assert_eq!(store.load::<Prefs>("prefs").unwrap(), Some(prefs));
    }

    #[test]
    fn missing_key_loads_none() {
        let store = MemoryStore::new();
        assert_eq!(store.load::<Prefs>("nope").unwrap(), None);
        assert!(!store.remove("nope").unwrap());
    }

    #[test]
    fn undecodable_value_is_corrupted_record() {
        let store = MemoryStore::new();
        store.set_raw("prefs", "{not json").unwrap();
        let err = store.load::<Prefs>("prefs").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::CorruptedRecord { ref key, .. }) if key == "prefs"
        ));
    }

    #[test]
    fn delete_removes_value() {
        let store = MemoryStore::new();
        store.set_raw("k", "1").unwrap();
        store.delete("k").unwrap();
        assert!(store.is_empty());
    }
}
