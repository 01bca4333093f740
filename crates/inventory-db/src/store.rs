//! # Item Store
//!
//! The handle the rest of the application talks to: CRUD on items plus live
//! views that refresh after every successful mutation.
//!
//! ## Write Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert / update / delete / watch_*                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  gate.lock().await   ← one at a time, store-wide                       │
//! │       │                                                                 │
//! │       ├── mutate row (ItemRepository)                                  │
//! │       ├── re-read all rows                                             │
//! │       └── ChangeFeed::publish(snapshot)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  gate released                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A new observer receives its first snapshot while holding the gate, so it
//! can never see a snapshot older than one it has already received.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::item::ItemRepository;
use crate::watch::{ChangeFeed, Observer, Subscription};
use inventory_core::Item;

/// Shared, cloneable handle to an unlocked item store.
#[derive(Clone)]
pub struct ItemStore {
    db: Database,
    feed: Arc<ChangeFeed>,
    gate: Arc<Mutex<()>>,
}

impl ItemStore {
    pub fn new(db: Database) -> Self {
        ItemStore {
            db,
            feed: ChangeFeed::new(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    fn items(&self) -> ItemRepository {
        self.db.items()
    }

    /// Inserts `item` and returns it carrying its new identifier.
    pub async fn insert(&self, item: &Item) -> DbResult<Item> {
        let _gate = self.gate.lock().await;
        let saved = self.items().insert(item).await?;
        self.publish().await;
        Ok(saved)
    }

    /// Replaces the stored record with the same identifier.
    ///
    /// ## Errors
    /// - `NotFound` when no record has `item.id`
    pub async fn update(&self, item: &Item) -> DbResult<()> {
        let _gate = self.gate.lock().await;
        self.items().update(item).await?;
        self.publish().await;
        Ok(())
    }

    /// Removes the stored record with the same identifier.
    ///
    /// ## Errors
    /// - `NotFound` when no record has `item.id`
    pub async fn delete(&self, item: &Item) -> DbResult<()> {
        let _gate = self.gate.lock().await;
        self.items().delete(item.id).await?;
        self.publish().await;
        Ok(())
    }

    pub async fn fetch_item(&self, id: i64) -> DbResult<Option<Item>> {
        self.items().get_by_id(id).await
    }

    pub async fn fetch_items(&self) -> DbResult<Vec<Item>> {
        self.items().list().await
    }

    pub async fn count(&self) -> DbResult<i64> {
        self.items().count().await
    }

    /// Live view of one record.
    ///
    /// `observer` is called immediately with the current record (or `None`)
    /// and again after every successful mutation until the returned
    /// [`Subscription`] is cancelled or dropped.
    pub async fn watch_item<F>(&self, id: i64, observer: F) -> DbResult<Subscription>
    where
        F: Fn(Option<&Item>) + Send + Sync + 'static,
    {
        self.watch(Observer::One {
            id,
            callback: Arc::new(observer),
        })
        .await
    }

    /// Live view of every record, in insertion order.
    pub async fn watch_items<F>(&self, observer: F) -> DbResult<Subscription>
    where
        F: Fn(&[Item]) + Send + Sync + 'static,
    {
        self.watch(Observer::All(Arc::new(observer))).await
    }

    async fn watch(&self, observer: Observer) -> DbResult<Subscription> {
        let _gate = self.gate.lock().await;
        let snapshot = self.fetch_items().await?;

        let subscription = self.feed.register(observer.clone());
        observer.deliver(&snapshot);

        debug!(observers = self.feed.len(), "Registered store observer");
        Ok(subscription)
    }

    /// Number of live views currently registered.
    pub fn observer_count(&self) -> usize {
        self.feed.len()
    }

    /// True when both handles point at the same opened store.
    pub fn ptr_eq(&self, other: &ItemStore) -> bool {
        Arc::ptr_eq(&self.feed, &other.feed)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) {
        info!("Closing item store");
        self.db.close().await;
    }

    async fn publish(&self) {
        if self.feed.is_empty() {
            return;
        }
        match self.fetch_items().await {
            Ok(items) => self.feed.publish(&items),
            Err(e) => error!(error = %e, "Failed to refresh live views"),
        }
    }
}

impl fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("db", &self.db)
            .field("feed", &self.feed)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
