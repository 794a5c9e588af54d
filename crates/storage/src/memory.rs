use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::kv::{KeyValueStore, StorageError};

/// In-memory key/value store for tests/dev.
///
/// Supports failure injection so callers can exercise their degraded paths
/// (reads and writes fail independently).
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    inner: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-seeded with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: RwLock::new(map),
            ..Self::default()
        }
    }

    /// Make subsequent `get` calls fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `set`/`remove` calls fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Synchronous peek, bypassing failure injection.
    pub fn peek(&self, key: &str) -> Option<String> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.peek(key).is_some()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let map = self
            .inner
            .read()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let mut map = self
            .inner
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let mut map = self
            .inner
            .write()
            .map_err(|_| StorageError::Unavailable("lock poisoned".to_string()))?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_set_remove_roundtrip() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("inventory").await.unwrap(), None);

        store.set("inventory", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("inventory").await.unwrap().as_deref(), Some("[]"));

        store.remove("inventory").await.unwrap();
        assert_eq!(store.get("inventory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_missing_key_is_ok() {
        let store = InMemoryKeyValueStore::new();
        store.remove("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn injected_write_failure_leaves_previous_value() {
        let store = InMemoryKeyValueStore::with_entries([("isDarkMode", "true")]);
        store.fail_writes(true);

        let err = store.set("isDarkMode", "false".to_string()).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(store.peek("isDarkMode").as_deref(), Some("true"));

        store.fail_writes(false);
        store.set("isDarkMode", "false".to_string()).await.unwrap();
        assert_eq!(store.peek("isDarkMode").as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn injected_read_failure() {
        let store = InMemoryKeyValueStore::with_entries([("inventory", "[]")]);
        store.fail_reads(true);
        assert!(matches!(
            store.get("inventory").await,
            Err(StorageError::Read { .. })
        ));
        // peek bypasses injection
        assert!(store.contains_key("inventory"));
    }
}
