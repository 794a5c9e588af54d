//! Change notifications broadcast by the inventory store.
//!
//! State events are published synchronously with the mutation; persistence
//! events are published later by the storage worker.

use crate::item::InventoryItem;

/// Something that happened to the inventory or its persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Persisted state was loaded (or found absent/unusable) at startup.
    Hydrated { items: usize },
    ItemAdded(InventoryItem),
    ItemMerged(InventoryItem),
    ItemUpdated(InventoryItem),
    ItemRemoved(InventoryItem),
    Cleared,
    /// Persistence operation `generation` reached storage.
    Persisted { generation: u64 },
    /// Persistence operation `generation` failed; in-memory state is unaffected.
    PersistFailed { generation: u64, error: String },
}

impl StoreEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::Hydrated { .. } => "inventory.hydrated",
            StoreEvent::ItemAdded(_) => "inventory.item.added",
            StoreEvent::ItemMerged(_) => "inventory.item.merged",
            StoreEvent::ItemUpdated(_) => "inventory.item.updated",
            StoreEvent::ItemRemoved(_) => "inventory.item.removed",
            StoreEvent::Cleared => "inventory.cleared",
            StoreEvent::Persisted { .. } => "inventory.persisted",
            StoreEvent::PersistFailed { .. } => "inventory.persist_failed",
        }
    }
}
