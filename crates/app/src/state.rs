use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use pantry_detection::{
    Catalog, Classifier, ClassifierError, HttpClassifier, ImagePayload, Prediction, ScanPipeline,
};
use pantry_inventory::InventoryStore;
use pantry_storage::{KeyValueStore, SqliteKeyValueStore};

use crate::config::{AppConfig, ENV_DETECT_API_KEY};

/// Stand-in used when no classifier API key is configured; every scan fails
/// with a configuration error instead of reaching the network.
#[derive(Debug, Default)]
pub struct UnconfiguredClassifier;

#[async_trait]
impl Classifier for UnconfiguredClassifier {
    async fn classify(&self, _image: &ImagePayload) -> Result<Vec<Prediction>, ClassifierError> {
        Err(ClassifierError::NotConfigured(format!(
            "set {ENV_DETECT_API_KEY} to enable scanning"
        )))
    }
}

/// Everything a command needs, wired once per process.
#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn KeyValueStore>,
    pub store: InventoryStore,
    pub scanner: Arc<ScanPipeline<Arc<dyn Classifier>>>,
}

impl AppState {
    /// Open the SQLite-backed state described by `config`.
    ///
    /// The database is initialized lazily on first use.
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(&config.db_path));
        Self::with_store(config, kv).await
    }

    /// Wire the state around an existing key/value backend.
    pub async fn with_store(config: &AppConfig, kv: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_path(path)
                .await
                .with_context(|| format!("failed to load catalog from {}", path.display()))?,
            None => Catalog::embedded().context("embedded food catalog is invalid")?,
        };
        let catalog = Arc::new(catalog);

        let classifier: Arc<dyn Classifier> = match &config.detect_api_key {
            Some(key) => Arc::new(
                HttpClassifier::new(&config.detect_url, key, config.detect_timeout)
                    .context("failed to build classifier client")?,
            ),
            None => {
                tracing::debug!("no classifier API key configured; scanning disabled");
                Arc::new(UnconfiguredClassifier)
            }
        };

        let store = InventoryStore::open(kv.clone());
        let scanner = ScanPipeline::new(classifier, catalog.clone(), store.clone())
            .with_expiry_policy(config.expiry_policy);

        Ok(Self {
            kv,
            store,
            scanner: Arc::new(scanner),
        })
    }
}
