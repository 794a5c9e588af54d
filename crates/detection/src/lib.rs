//! `pantry-detection`
//!
//! **Responsibility:** turn a captured image into inventory additions.
//!
//! - [`Classifier`]: image -> labelled predictions (hosted model over HTTP).
//! - [`Catalog`]: label -> category lookup.
//! - [`ScanPipeline`]: glue that feeds predictions into the inventory store.

pub mod catalog;
pub mod classifier;
pub mod http;
pub mod image;
pub mod pipeline;

pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use classifier::{Classifier, ClassifierError, DetectionResponse, Prediction};
pub use http::HttpClassifier;
pub use image::{ImageError, ImagePayload};
pub use pipeline::{ExpiryPolicy, IngestedItem, ScanError, ScanOutcome, ScanPipeline};
