//! User preferences persisted next to the inventory.

use std::sync::Arc;

use pantry_storage::{KeyValueStore, StorageError, keys};

/// Persisted UI preferences. Currently just the dark-mode flag.
pub struct Preferences {
    kv: Arc<dyn KeyValueStore>,
    dark_mode: bool,
}

impl Preferences {
    /// Load stored preferences; absent or unreadable values fall back to
    /// defaults.
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let dark_mode = match kv.get(keys::DARK_MODE).await {
            Ok(Some(raw)) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "stored dark-mode flag is malformed; using default");
                false
            }),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read dark-mode flag; using default");
                false
            }
        };

        Self { kv, dark_mode }
    }

    pub fn is_dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Update the flag and write it through. The in-memory value changes even
    /// if the write fails.
    pub async fn set_dark_mode(&mut self, enabled: bool) -> Result<(), StorageError> {
        self.dark_mode = enabled;
        self.kv
            .set(keys::DARK_MODE, enabled.to_string())
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "failed to persist dark-mode flag"))
    }

    pub async fn toggle_dark_mode(&mut self) -> Result<bool, StorageError> {
        let enabled = !self.dark_mode;
        self.set_dark_mode(enabled).await?;
        Ok(enabled)
    }
}

impl core::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Preferences")
            .field("dark_mode", &self.dark_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_storage::InMemoryKeyValueStore;

    #[tokio::test]
    async fn dark_mode_round_trips_as_json_bool() {
        let kv = Arc::new(InMemoryKeyValueStore::new());

        let mut prefs = Preferences::load(kv.clone()).await;
        assert!(!prefs.is_dark_mode());

        assert!(prefs.toggle_dark_mode().await.unwrap());
        assert_eq!(kv.peek(keys::DARK_MODE).as_deref(), Some("true"));

        let reloaded = Preferences::load(kv.clone()).await;
        assert!(reloaded.is_dark_mode());
    }

    #[tokio::test]
    async fn malformed_flag_defaults_to_light() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(keys::DARK_MODE, "yes please")]));
        let prefs = Preferences::load(kv).await;
        assert!(!prefs.is_dark_mode());
    }

    #[tokio::test]
    async fn failed_write_keeps_in_memory_value() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let mut prefs = Preferences::load(kv.clone()).await;
        kv.fail_writes(true);

        assert!(prefs.set_dark_mode(true).await.is_err());
        assert!(prefs.is_dark_mode());
        assert_eq!(kv.peek(keys::DARK_MODE), None);
    }
}
