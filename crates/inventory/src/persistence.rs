//! Write-through persistence worker.
//!
//! One background task owns all storage IO for a store:
//!
//! 1. hydrate once from the persisted snapshot,
//! 2. then drain persistence operations strictly in issuance order.
//!
//! A write serializes the live collection at the moment it runs, so the last
//! completed write always matches memory, including after hydration replaced
//! items that were added before the initial load finished.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use pantry_storage::{KeyValueStore, StorageError, keys};

use crate::events::StoreEvent;
use crate::item::InventoryItem;
use crate::store::Shared;

/// A queued persistence operation, tagged with its issuance generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PersistOp {
    /// Write the full collection under the inventory key.
    Write { generation: u64 },
    /// Delete the inventory key entirely.
    Remove { generation: u64 },
}

impl PersistOp {
    pub(crate) fn generation(&self) -> u64 {
        match self {
            PersistOp::Write { generation } | PersistOp::Remove { generation } => *generation,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode inventory snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

pub(crate) struct PersistenceWorker<S> {
    kv: S,
    shared: Arc<Shared>,
    ops: mpsc::UnboundedReceiver<PersistOp>,
}

impl<S> PersistenceWorker<S>
where
    S: KeyValueStore,
{
    pub(crate) fn new(kv: S, shared: Arc<Shared>, ops: mpsc::UnboundedReceiver<PersistOp>) -> Self {
        Self { kv, shared, ops }
    }

    /// Run until every store handle is dropped.
    pub(crate) async fn run(mut self) {
        self.hydrate().await;

        while let Some(op) = self.ops.recv().await {
            let generation = op.generation();
            let result = match op {
                PersistOp::Write { .. } => self.write_snapshot().await,
                PersistOp::Remove { .. } => self
                    .kv
                    .remove(keys::INVENTORY)
                    .await
                    .map_err(PersistError::from),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(generation, "inventory snapshot persisted");
                    self.shared.publish(StoreEvent::Persisted { generation });
                }
                Err(err) => {
                    tracing::warn!(
                        generation,
                        error = %err,
                        "failed to persist inventory; continuing with in-memory state"
                    );
                    self.shared.publish(StoreEvent::PersistFailed {
                        generation,
                        error: err.to_string(),
                    });
                }
            }

            self.shared.completed.send_replace(generation);
        }

        tracing::debug!("inventory persistence worker stopped");
    }

    async fn hydrate(&self) {
        let loaded = match self.kv.get(keys::INVENTORY).await {
            Ok(Some(blob)) => match decode_snapshot(&blob) {
                Ok(items) => Some(items),
                Err(err) => {
                    tracing::warn!(error = %err, "persisted inventory is malformed; starting empty");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("no persisted inventory; starting empty");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted inventory; starting empty");
                None
            }
        };

        let count = match loaded {
            Some(items) => {
                let mut live = self.shared.write_items();
                if !live.is_empty() {
                    tracing::warn!(
                        discarded = live.len(),
                        "hydration replaced items changed before the initial load"
                    );
                }
                *live = items;
                live.len()
            }
            None => self.shared.read_items().len(),
        };

        tracing::info!(items = count, "inventory hydrated");
        self.shared.hydrated.send_replace(true);
        self.shared.publish(StoreEvent::Hydrated { items: count });
    }

    async fn write_snapshot(&self) -> Result<(), PersistError> {
        let blob = {
            let items = self.shared.read_items();
            serde_json::to_string(&*items)?
        };
        self.kv.set(keys::INVENTORY, blob).await?;
        Ok(())
    }
}

/// Decode a persisted snapshot, restoring the one-item-per-name rule.
///
/// Only a blob that is not a JSON array fails. Rows that do not decode as an
/// item are skipped one by one so the rest of the pantry survives.
pub(crate) fn decode_snapshot(blob: &str) -> Result<Vec<InventoryItem>, serde_json::Error> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(blob)?;
    let mut items = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let id = row
            .get("id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        match serde_json::from_value::<InventoryItem>(row) {
            Ok(item) => items.push(item),
            Err(err) => {
                tracing::warn!(index, item_id = %id, error = %err, "skipping unreadable inventory row");
            }
        }
    }

    Ok(merge_duplicates(items))
}

/// Fold same-name entries into their first occurrence, summing quantities.
///
/// Snapshots written by append-only clients can hold one row per scan.
fn merge_duplicates(items: Vec<InventoryItem>) -> Vec<InventoryItem> {
    let mut merged: Vec<InventoryItem> = Vec::with_capacity(items.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = item.dedup_key();
        match positions.get(&key) {
            Some(&pos) => merged[pos].accumulate(item.quantity()),
            None => {
                positions.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
