//! The authoritative in-memory inventory with write-through persistence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, mpsc, watch};

use pantry_core::{DomainError, DomainResult, Entity, ItemId};
use pantry_storage::KeyValueStore;

use crate::events::StoreEvent;
use crate::item::{InventoryItem, ItemPatch, NewItem, dedup_key};
use crate::persistence::{PersistOp, PersistenceWorker};
use crate::query::{InventoryQuery, InventorySummary, summarize};

const EVENT_CAPACITY: usize = 256;

/// State shared between store handles and the persistence worker.
#[derive(Debug)]
pub(crate) struct Shared {
    items: RwLock<Vec<InventoryItem>>,
    events: broadcast::Sender<StoreEvent>,
    pub(crate) hydrated: watch::Sender<bool>,
    issued: AtomicU64,
    pub(crate) completed: watch::Sender<u64>,
}

impl Shared {
    pub(crate) fn read_items(&self) -> RwLockReadGuard<'_, Vec<InventoryItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_items(&self) -> RwLockWriteGuard<'_, Vec<InventoryItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Result of [`InventoryStore::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// No item had this name; a new one was created.
    Inserted(InventoryItem),
    /// The quantity was folded into an existing item with the same name.
    Merged(InventoryItem),
}

impl AddOutcome {
    pub fn item(&self) -> &InventoryItem {
        match self {
            AddOutcome::Inserted(item) | AddOutcome::Merged(item) => item,
        }
    }

    pub fn into_item(self) -> InventoryItem {
        match self {
            AddOutcome::Inserted(item) | AddOutcome::Merged(item) => item,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, AddOutcome::Merged(_))
    }
}

/// Handle to the pantry inventory.
///
/// Cheap to clone; all clones see the same collection. Mutations apply
/// synchronously and return immediately, persistence happens on a background
/// task (see [`InventoryStore::flush`]).
///
/// Invariant: at most one item per trimmed, case-folded name.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    shared: Arc<Shared>,
    ops: mpsc::UnboundedSender<PersistOp>,
}

impl InventoryStore {
    /// Create the store and start hydrating it from `kv`.
    ///
    /// Returns before the persisted snapshot is loaded; await
    /// [`ready`](Self::ready) for the initial-load signal. Must be called
    /// from within a Tokio runtime.
    pub fn open<S>(kv: S) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            items: RwLock::new(Vec::new()),
            events,
            hydrated: watch::Sender::new(false),
            issued: AtomicU64::new(0),
            completed: watch::Sender::new(0),
        });

        let worker = PersistenceWorker::new(kv, shared.clone(), ops_rx);
        tokio::spawn(worker.run());

        Self {
            shared,
            ops: ops_tx,
        }
    }

    /// Resolves once the persisted snapshot has been loaded (or found
    /// absent/unusable).
    pub async fn ready(&self) {
        let mut rx = self.shared.hydrated.subscribe();
        // The sender lives in `shared`, which we hold.
        let _ = rx.wait_for(|hydrated| *hydrated).await;
    }

    pub fn is_hydrated(&self) -> bool {
        *self.shared.hydrated.borrow()
    }

    /// Resolves once every persistence operation issued so far has been
    /// attempted, successfully or not.
    pub async fn flush(&self) {
        let target = self.shared.issued.load(Ordering::SeqCst);
        let mut rx = self.shared.completed.subscribe();
        let _ = rx.wait_for(|done| *done >= target).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    /// Add a candidate, merging into an existing item of the same name.
    ///
    /// On a merge only the quantity changes; the existing name casing,
    /// category, expiry, id and `date_added` are kept.
    pub fn add_item(&self, candidate: NewItem) -> AddOutcome {
        let key = dedup_key(candidate.name());

        let outcome = {
            let mut items = self.shared.write_items();
            let outcome = match items.iter_mut().find(|item| item.dedup_key() == key) {
                Some(existing) => {
                    existing.accumulate(candidate.quantity());
                    AddOutcome::Merged(existing.clone())
                }
                None => {
                    let item = InventoryItem::create(candidate, Utc::now());
                    items.push(item.clone());
                    AddOutcome::Inserted(item)
                }
            };
            self.persist(|generation| PersistOp::Write { generation });
            outcome
        };

        match &outcome {
            AddOutcome::Inserted(item) => {
                tracing::info!(
                    item_id = %item.id(),
                    name = item.name(),
                    quantity = %item.quantity(),
                    category = %item.category(),
                    "inventory item added"
                );
                self.shared.publish(StoreEvent::ItemAdded(item.clone()));
            }
            AddOutcome::Merged(item) => {
                tracing::info!(
                    item_id = %item.id(),
                    name = item.name(),
                    quantity = %item.quantity(),
                    "inventory item merged"
                );
                self.shared.publish(StoreEvent::ItemMerged(item.clone()));
            }
        }

        outcome
    }

    /// Apply `patch` to the item with `id`.
    ///
    /// `Ok(None)` when there is no such item (nothing changes, nothing is
    /// written). A rename onto another item's name is a `Conflict`.
    pub fn update_item(&self, id: &ItemId, patch: ItemPatch) -> DomainResult<Option<InventoryItem>> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let updated = {
            let mut items = self.shared.write_items();
            let Some(pos) = items.iter().position(|item| item.id() == id) else {
                tracing::debug!(item_id = %id, "update ignored; no such item");
                return Ok(None);
            };

            if let Some(name) = patch.name.as_deref() {
                let key = dedup_key(name);
                if items
                    .iter()
                    .any(|other| other.id() != id && other.dedup_key() == key)
                {
                    return Err(DomainError::conflict(format!(
                        "an item named `{}` already exists",
                        name.trim()
                    )));
                }
            }

            items[pos].apply_patch(patch);
            let updated = items[pos].clone();
            self.persist(|generation| PersistOp::Write { generation });
            updated
        };

        tracing::info!(item_id = %id, name = updated.name(), "inventory item updated");
        self.shared.publish(StoreEvent::ItemUpdated(updated.clone()));
        Ok(Some(updated))
    }

    /// Remove the item with `id`. Idempotent: `None` if it was not there.
    pub fn remove_item(&self, id: &ItemId) -> Option<InventoryItem> {
        let removed = {
            let mut items = self.shared.write_items();
            let pos = items.iter().position(|item| item.id() == id)?;
            let removed = items.remove(pos);
            self.persist(|generation| PersistOp::Write { generation });
            removed
        };

        tracing::info!(item_id = %id, name = removed.name(), "inventory item removed");
        self.shared.publish(StoreEvent::ItemRemoved(removed.clone()));
        Some(removed)
    }

    /// Empty the inventory and delete the persisted snapshot key.
    pub fn clear_inventory(&self) {
        let cleared = {
            let mut items = self.shared.write_items();
            let cleared = items.len();
            items.clear();
            self.persist(|generation| PersistOp::Remove { generation });
            cleared
        };

        tracing::info!(cleared, "inventory cleared");
        self.shared.publish(StoreEvent::Cleared);
    }

    /// Snapshot of all items in insertion order.
    pub fn items(&self) -> Vec<InventoryItem> {
        self.shared.read_items().clone()
    }

    pub fn get(&self, id: &ItemId) -> Option<InventoryItem> {
        self.shared
            .read_items()
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<InventoryItem> {
        let key = dedup_key(name);
        self.shared
            .read_items()
            .iter()
            .find(|item| item.dedup_key() == key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.read_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read_items().is_empty()
    }

    pub fn query(&self, query: &InventoryQuery) -> Vec<InventoryItem> {
        self.shared
            .read_items()
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect()
    }

    pub fn summary(
        &self,
        today: NaiveDate,
        low_stock_threshold: u32,
        expiring_within_days: u32,
    ) -> InventorySummary {
        summarize(
            &self.shared.read_items(),
            today,
            low_stock_threshold,
            expiring_within_days,
        )
    }

    /// Queue a persistence operation. Callers hold the items write lock so
    /// generations follow mutation order.
    fn persist(&self, op: fn(u64) -> PersistOp) {
        let generation = self.shared.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if self.ops.send(op(generation)).is_err() {
            tracing::warn!(generation, "persistence worker stopped; change kept in memory only");
            self.shared.completed.send_if_modified(|done| {
                if *done < generation {
                    *done = generation;
                    true
                } else {
                    false
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Category, Quantity};
    use pantry_storage::{InMemoryKeyValueStore, keys};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn new_item(name: &str, quantity: u32, category: Category) -> NewItem {
        NewItem::new(name, qty(quantity), category).unwrap()
    }

    fn persisted(kv: &InMemoryKeyValueStore) -> Option<Vec<serde_json::Value>> {
        kv.peek(keys::INVENTORY)
            .map(|blob| serde_json::from_str(&blob).unwrap())
    }

    async fn ready_store() -> (InventoryStore, Arc<InMemoryKeyValueStore>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let store = InventoryStore::open(kv.clone());
        store.ready().await;
        (store, kv)
    }

    #[tokio::test]
    async fn adding_same_name_merges_and_keeps_first_casing() {
        let (store, _kv) = ready_store().await;

        let first = store.add_item(new_item("Apple", 2, Category::Fruits));
        let second = store.add_item(new_item("apple", 3, Category::Detected));

        assert!(!first.is_merge());
        assert!(second.is_merge());

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "Apple");
        assert_eq!(items[0].quantity().get(), 5);
        assert_eq!(items[0].category(), Category::Fruits);
        assert_eq!(items[0].id(), first.item().id());
    }

    #[tokio::test]
    async fn add_writes_through_to_storage() {
        let (store, kv) = ready_store().await;

        store.add_item(new_item("Rice", 1, Category::Pantry));
        store.flush().await;

        let blob = persisted(&kv).unwrap();
        assert_eq!(blob.len(), 1);
        assert_eq!(blob[0]["name"], "Rice");
        assert_eq!(blob[0]["category"], "Pantry");
        assert_eq!(blob[0]["expiryDate"], "");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (store, _kv) = ready_store().await;
        let bread = store.add_item(new_item("Bread", 1, Category::Pantry)).into_item();
        store.add_item(new_item("Milk", 1, Category::Dairy));

        let removed = store.remove_item(bread.id());
        assert_eq!(removed.as_ref().map(InventoryItem::name), Some("Bread"));
        let after_first = store.items();

        assert!(store.remove_item(bread.id()).is_none());
        assert_eq!(store.items(), after_first);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clear_deletes_the_persisted_key() {
        let (store, kv) = ready_store().await;
        store.add_item(new_item("Eggs", 12, Category::Dairy));
        store.flush().await;
        assert!(kv.contains_key(keys::INVENTORY));

        store.clear_inventory();
        store.flush().await;

        assert!(store.is_empty());
        assert_eq!(kv.peek(keys::INVENTORY), None);
    }

    #[tokio::test]
    async fn hydrated_item_merges_with_later_add() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(
            keys::INVENTORY,
            r#"[{"id":"x1","name":"Milk","quantity":1,"category":"Dairy","expiryDate":"","dateAdded":"2024-01-01T00:00:00Z"}]"#,
        )]));
        let store = InventoryStore::open(kv.clone());
        store.ready().await;
        assert!(store.is_hydrated());

        store.add_item(new_item("milk", 1, Category::Detected));
        store.flush().await;

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id().as_str(), "x1");
        assert_eq!(items[0].name(), "Milk");
        assert_eq!(items[0].quantity().get(), 2);

        let blob = persisted(&kv).unwrap();
        assert_eq!(blob[0]["quantity"], 2);
    }

    #[tokio::test]
    async fn one_bad_row_does_not_cost_the_rest_of_the_snapshot() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(
            keys::INVENTORY,
            r#"[
                {"id":"m1","name":"Milk","quantity":3,"category":"Dairy","expiryDate":"","dateAdded":"2024-01-01T00:00:00Z"},
                {"id":"c1","name":"Chips","quantity":1,"category":"dairy","expiryDate":"","dateAdded":"2024-01-01T00:00:00Z"},
                {"id":"r1","name":"Rice","quantity":0,"category":"Pantry","expiryDate":"","dateAdded":"2024-01-01T00:00:00Z"}
            ]"#,
        )]));
        let store = InventoryStore::open(kv.clone());
        store.ready().await;

        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_name("milk").unwrap().quantity().get(), 3);
        assert_eq!(store.find_by_name("chips").unwrap().category(), Category::Dairy);

        store.add_item(new_item("Tea", 1, Category::Pantry));
        store.flush().await;

        let blob = persisted(&kv).unwrap();
        let names: Vec<_> = blob.iter().map(|row| row["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["Milk", "Chips", "Tea"]);
        assert_eq!(blob[0]["quantity"], 3);
        assert_eq!(blob[1]["category"], "Dairy");
    }

    #[tokio::test]
    async fn malformed_snapshot_hydrates_empty() {
        let kv = InMemoryKeyValueStore::with_entries([(keys::INVENTORY, "{not json")]);
        let store = InventoryStore::open(kv);
        store.ready().await;

        assert!(store.is_hydrated());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn read_failure_hydrates_empty() {
        let kv = InMemoryKeyValueStore::new();
        kv.fail_reads(true);
        let store = InventoryStore::open(kv);
        store.ready().await;

        assert!(store.is_empty());
        store.add_item(new_item("Tea", 1, Category::Pantry));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn hydration_overwrites_pre_load_mutations_and_disk_follows() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(
            keys::INVENTORY,
            r#"[{"id":"x1","name":"Milk","quantity":1,"category":"Dairy","expiryDate":"","dateAdded":"2024-01-01T00:00:00Z"}]"#,
        )]));
        let store = InventoryStore::open(kv.clone());

        // The worker has not run yet on this single-threaded runtime.
        store.add_item(new_item("Eggs", 6, Category::Dairy));
        assert!(!store.is_hydrated());
        assert!(store.find_by_name("eggs").is_some());

        store.ready().await;
        store.flush().await;

        let names: Vec<_> = store.items().iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, vec!["Milk".to_string()]);

        let blob = persisted(&kv).unwrap();
        assert_eq!(blob.len(), 1);
        assert_eq!(blob[0]["name"], "Milk");
    }

    #[tokio::test]
    async fn persistence_failure_keeps_memory_and_reports() {
        let (store, kv) = ready_store().await;
        let mut events = store.subscribe();
        kv.fail_writes(true);

        store.add_item(new_item("Butter", 1, Category::Dairy));
        store.flush().await;

        assert_eq!(store.len(), 1);
        assert_eq!(kv.peek(keys::INVENTORY), None);

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, StoreEvent::PersistFailed { generation: 1, .. }) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn update_applies_patch_and_persists() {
        let (store, kv) = ready_store().await;
        let item = store.add_item(new_item("Yogurt", 1, Category::Dairy)).into_item();
        let expiry = NaiveDate::from_ymd_opt(2024, 7, 1);

        let updated = store
            .update_item(
                item.id(),
                ItemPatch::new().quantity(qty(4)).expiry_date(expiry),
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.quantity().get(), 4);
        assert_eq!(updated.expiry_date(), expiry);
        assert_eq!(updated.date_added(), item.date_added());

        store.flush().await;
        let blob = persisted(&kv).unwrap();
        assert_eq!(blob[0]["quantity"], 4);
        assert_eq!(blob[0]["expiryDate"], "2024-07-01");
    }

    #[tokio::test]
    async fn update_of_missing_id_is_a_silent_noop() {
        let (store, kv) = ready_store().await;
        store.add_item(new_item("Salt", 1, Category::Pantry));
        store.flush().await;
        let before = kv.peek(keys::INVENTORY);
        let mut events = store.subscribe();

        let missing: ItemId = "does-not-exist".parse().unwrap();
        let result = store.update_item(&missing, ItemPatch::new().quantity(qty(9)));

        assert_eq!(result, Ok(None));
        store.flush().await;
        assert_eq!(kv.peek(keys::INVENTORY), before);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_rejected() {
        let (store, _kv) = ready_store().await;
        store.add_item(new_item("Apple", 1, Category::Fruits));
        let pear = store.add_item(new_item("Pear", 2, Category::Fruits)).into_item();

        let err = store
            .update_item(pear.id(), ItemPatch::new().name(" APPLE "))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = store
            .update_item(pear.id(), ItemPatch::new().name("   "))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert_eq!(store.get(pear.id()).unwrap().name(), "Pear");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn renaming_an_item_to_its_own_name_is_allowed() {
        let (store, _kv) = ready_store().await;
        let apple = store.add_item(new_item("apple", 1, Category::Fruits)).into_item();

        let updated = store
            .update_item(apple.id(), ItemPatch::new().name("Apple"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.name(), "Apple");
    }

    #[tokio::test]
    async fn mutations_broadcast_events_in_order() {
        let kv = InMemoryKeyValueStore::new();
        let store = InventoryStore::open(kv);
        let mut events = store.subscribe();

        store.add_item(new_item("Oats", 1, Category::Pantry));
        store.add_item(new_item("oats", 1, Category::Pantry));
        store.clear_inventory();
        store.ready().await;
        store.flush().await;

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec![
                "inventory.item.added",
                "inventory.item.merged",
                "inventory.cleared",
                "inventory.hydrated",
                "inventory.persisted",
                "inventory.persisted",
                "inventory.persisted",
            ]
        );
    }

    #[tokio::test]
    async fn query_and_summary_read_the_live_collection() {
        let (store, _kv) = ready_store().await;
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        store.add_item(
            new_item("Milk", 1, Category::Dairy).with_expiry(NaiveDate::from_ymd_opt(2024, 5, 11)),
        );
        store.add_item(new_item("Apple", 6, Category::Fruits));

        let dairy = store.query(&InventoryQuery::all().category(Category::Dairy));
        assert_eq!(dairy.len(), 1);
        assert_eq!(dairy[0].name(), "Milk");

        let summary = store.summary(today, 2, 3);
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.total_quantity, 7);
        assert_eq!(summary.low_stock, 1);
        assert_eq!(summary.expiring_soon, 1);
    }

    fn name_strategy() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "apple", "Apple", " APPLE", "milk", "Milk ", "MILK", "bread", "Bread", "rice",
        ])
    }

    proptest! {
        #[test]
        fn at_most_one_entry_per_folded_name(
            adds in prop::collection::vec((name_strategy(), 1u32..50), 1..40)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let items = rt.block_on(async {
                let store = InventoryStore::open(InMemoryKeyValueStore::new());
                store.ready().await;
                for (name, quantity) in &adds {
                    store.add_item(new_item(name, *quantity, Category::Detected));
                }
                store.flush().await;
                store.items()
            });

            let mut expected: HashMap<String, u32> = HashMap::new();
            let mut first_seen: HashMap<String, String> = HashMap::new();
            for (name, quantity) in &adds {
                *expected.entry(dedup_key(name)).or_default() += quantity;
                first_seen
                    .entry(dedup_key(name))
                    .or_insert_with(|| name.trim().to_string());
            }

            prop_assert_eq!(items.len(), expected.len());
            for item in &items {
                let key = item.dedup_key();
                prop_assert_eq!(Some(&item.quantity().get()), expected.get(&key));
                prop_assert_eq!(Some(&item.name().to_string()), first_seen.get(&key));
            }
        }
    }
}
