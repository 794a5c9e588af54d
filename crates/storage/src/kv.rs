use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Well-known keys written by the pantry client.
pub mod keys {
    /// Serialized inventory list (JSON array of items).
    pub const INVENTORY: &str = "inventory";
    /// Dark-mode preference (JSON boolean).
    pub const DARK_MODE: &str = "isDarkMode";
}

/// Key/value storage failure.
///
/// Callers in the pantry client treat these as non-fatal: the in-memory state
/// stays authoritative and the failure is logged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage read failed for key `{key}`: {reason}")]
    Read { key: String, reason: String },

    #[error("storage write failed for key `{key}`: {reason}")]
    Write { key: String, reason: String },

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

/// Durable string-blob store keyed by name.
///
/// All operations are async because real backends do IO; every call is a
/// suspension point for the caller.
///
/// `get` returns `Ok(None)` for a key that was never written or was removed.
/// `remove` on a missing key is not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key).await
    }
}
