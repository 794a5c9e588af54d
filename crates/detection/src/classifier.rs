//! Detection Classifier contract.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::ImagePayload;

/// One detected object.
///
/// Only `label` drives ingestion; the rest is carried for display/logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "class")]
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl Prediction {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
            x: None,
            y: None,
            width: None,
            height: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Classifier response document. A missing `predictions` field means nothing
/// was detected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("network error: {0}")]
    Network(String),

    #[error("classifier returned {0}: {1}")]
    Api(u16, String),

    #[error("invalid classifier response: {0}")]
    Parse(String),

    #[error("classifier is not configured: {0}")]
    NotConfigured(String),
}

/// Turns an image into labelled predictions.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImagePayload) -> Result<Vec<Prediction>, ClassifierError>;
}

#[async_trait]
impl<C> Classifier for Arc<C>
where
    C: Classifier + ?Sized,
{
    async fn classify(&self, image: &ImagePayload) -> Result<Vec<Prediction>, ClassifierError> {
        (**self).classify(image).await
    }
}
