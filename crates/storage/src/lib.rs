//! `pantry-storage`
//!
//! **Responsibility:** durable, device-local key/value persistence.
//!
//! The store only moves opaque string blobs around; it knows nothing about
//! the inventory schema. Callers own serialization.

pub mod kv;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use kv::{KeyValueStore, StorageError, keys};
pub use memory::InMemoryKeyValueStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKeyValueStore;
