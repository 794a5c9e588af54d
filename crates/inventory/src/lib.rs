//! Inventory domain module.
//!
//! Owns the pantry collection: one item per (case-insensitive) name, applied
//! synchronously in memory and written through to a [`pantry_storage`]
//! key/value backend by a single background task.

pub mod events;
pub mod item;
mod persistence;
pub mod query;
pub mod store;

pub use events::StoreEvent;
pub use item::{Category, InventoryItem, ItemPatch, NewItem, Quantity, dedup_key, parse_expiry};
pub use query::{InventoryQuery, InventorySummary};
pub use store::{AddOutcome, InventoryStore};
