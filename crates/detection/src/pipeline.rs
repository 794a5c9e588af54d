//! Detection ingestion: classifier output -> inventory mutations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Days, NaiveDate, Utc};
use thiserror::Error;

use pantry_inventory::{AddOutcome, Category, InventoryStore, NewItem, Quantity};

use crate::catalog::Catalog;
use crate::classifier::{Classifier, ClassifierError, Prediction};
use crate::image::ImagePayload;

/// How scanned items get an expiry date. Fixed per pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Leave expiry empty.
    #[default]
    Unknown,
    /// Capture date plus `n` days.
    DaysAfterCapture(u32),
}

impl ExpiryPolicy {
    pub fn expiry_for(&self, captured_on: NaiveDate) -> Option<NaiveDate> {
        match self {
            ExpiryPolicy::Unknown => None,
            ExpiryPolicy::DaysAfterCapture(days) => {
                captured_on.checked_add_days(Days::new(u64::from(*days)))
            }
        }
    }
}

/// One prediction that made it into the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedItem {
    pub prediction: Prediction,
    /// Whether the label was found in the catalog.
    pub catalog_hit: bool,
    pub outcome: AddOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Added(Vec<IngestedItem>),
    NothingDetected,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    Busy,

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Holds the "processing" flag for the duration of one scan.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScanPipeline<C> {
    classifier: C,
    catalog: Arc<Catalog>,
    store: InventoryStore,
    policy: ExpiryPolicy,
    processing: AtomicBool,
}

impl<C> ScanPipeline<C>
where
    C: Classifier,
{
    pub fn new(classifier: C, catalog: Arc<Catalog>, store: InventoryStore) -> Self {
        Self {
            classifier,
            catalog,
            store,
            policy: ExpiryPolicy::default(),
            processing: AtomicBool::new(false),
        }
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Classify one captured image and add everything it contains.
    ///
    /// Rejects with `Busy` while another scan is pending; nothing is queued.
    pub async fn scan(&self, image: &ImagePayload) -> Result<ScanOutcome, ScanError> {
        let _guard = ProcessingGuard::acquire(&self.processing).ok_or(ScanError::Busy)?;

        let predictions = self.classifier.classify(image).await.map_err(|err| {
            tracing::warn!(error = %err, "object detection failed");
            ScanError::Classifier(err)
        })?;

        Ok(self.ingest(predictions, Utc::now().date_naive()))
    }

    /// Apply classifier output to the inventory. Every prediction with a
    /// non-blank label is accepted; unknown labels land in `Detected`.
    pub fn ingest(&self, predictions: Vec<Prediction>, captured_on: NaiveDate) -> ScanOutcome {
        let expiry = self.policy.expiry_for(captured_on);
        let mut ingested = Vec::with_capacity(predictions.len());

        for prediction in predictions {
            let label = prediction.label.trim();
            if label.is_empty() {
                tracing::warn!("skipping prediction with empty label");
                continue;
            }

            let hit = self.catalog.lookup(label);
            let (name, category) = match hit {
                Some(entry) => (entry.name.clone(), entry.category),
                None => {
                    tracing::info!(label, "label not in catalog; filing under Detected");
                    (label.to_string(), Category::Detected)
                }
            };

            let candidate = match NewItem::new(name, Quantity::ONE, category) {
                Ok(candidate) => candidate.with_expiry(expiry),
                Err(err) => {
                    tracing::warn!(label, error = %err, "skipping unusable prediction");
                    continue;
                }
            };

            let outcome = self.store.add_item(candidate);
            ingested.push(IngestedItem {
                catalog_hit: hit.is_some(),
                prediction,
                outcome,
            });
        }

        if ingested.is_empty() {
            tracing::info!("no items detected");
            ScanOutcome::NothingDetected
        } else {
            tracing::info!(items = ingested.len(), "scan ingested");
            ScanOutcome::Added(ingested)
        }
    }
}
