// In-memory store implementation

use super::{LocalStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory key-value store, used in tests and session-only deployments
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap();
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();

        store.set("essencia_session_id", "abc-123").unwrap();

        let value = store.get("essencia_session_id").unwrap();
        assert_eq!(value, Some("abc-123".to_string()));
    }

    #[test]
    fn test_get_missing_key() {
        let store = MemoryStore::new();

        let value = store.get("does-not-exist").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::new();

        store.set("key", "value").unwrap();
        store.remove("key").unwrap();

        assert!(store.get("key").unwrap().is_none());

        // Removing an absent key is fine
        store.remove("key").unwrap();
    }

    #[test]
    fn test_overwrite() {
        let store = MemoryStore::new();

        store.set("key", "first").unwrap();
        store.set("key", "second").unwrap();

        assert_eq!(store.get("key").unwrap(), Some("second".to_string()));
    }
}
