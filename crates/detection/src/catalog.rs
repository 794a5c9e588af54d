//! Catalog Lookup: static food label -> category mapping.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pantry_inventory::{Category, dedup_key};

const EMBEDDED_CATALOG: &str = include_str!("../data/food_catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub category: Category,
}

/// Known foods, matched by case-insensitive exact name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), entries = catalog.len(), "loaded food catalog");
        Ok(catalog)
    }

    /// Parse a JSON array of `{ "name", "category" }`. Unknown categories fail.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            let key = dedup_key(&entry.name);
            if key.is_empty() {
                continue;
            }
            if catalog.index.contains_key(&key) {
                tracing::debug!(name = %entry.name, "duplicate catalog entry ignored");
                continue;
            }
            catalog.index.insert(key, catalog.entries.len());
            catalog.entries.push(entry);
        }
        catalog
    }

    pub fn lookup(&self, label: &str) -> Option<&CatalogEntry> {
        self.index
            .get(&dedup_key(label))
            .and_then(|&pos| self.entries.get(pos))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
