//! # Inventory View-Model
//!
//! What the screens call. Validation happens on the caller's task; store
//! writes are queued to a single background worker and never awaited.
//!
//! ## Job Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_new_item / update_item / sell_item / delete_item / add_imported    │
//! │       │                                                                 │
//! │       │ validate (returns ValidationError, nothing queued)              │
//! │       ▼                                                                 │
//! │  mpsc::UnboundedSender<Job>  ── submission order preserved ──┐          │
//! │                                                              ▼          │
//! │                                                    StoreWorker::run     │
//! │                                                      │                  │
//! │                                                      ├─ ItemStore op    │
//! │                                                      │   └─ observers   │
//! │                                                      └─ error! on fail  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The worker stops once every view-model clone has been dropped.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::AppResult;
use inventory_core::{
    validate_entry, validate_item, validation, Item, ItemEntry, ItemOrigin, ValidationResult,
};
use inventory_db::{DbError, DbResult, ItemStore, Subscription};

// =============================================================================
// Worker
// =============================================================================

#[derive(Debug)]
enum Job {
    Insert(Item),
    Update(Item),
    Delete(Item),
    /// Sell one unit of the stored row with this id.
    Sell(i64),
    /// Answered once every earlier job has been applied.
    Barrier(oneshot::Sender<()>),
}

struct StoreWorker {
    store: ItemStore,
    jobs: mpsc::UnboundedReceiver<Job>,
}

impl StoreWorker {
    async fn run(mut self) {
        info!("Store worker starting");

        while let Some(job) = self.jobs.recv().await {
            match job {
                Job::Insert(item) => {
                    if let Err(e) = self.store.insert(&item).await {
                        error!(?e, name = %item.name, "Failed to insert item");
                    }
                }
                Job::Update(item) => {
                    if let Err(e) = self.store.update(&item).await {
                        error!(?e, item_id = item.id, "Failed to update item");
                    }
                }
                Job::Delete(item) => {
                    if let Err(e) = self.store.delete(&item).await {
                        error!(?e, item_id = item.id, "Failed to delete item");
                    }
                }
                Job::Sell(id) => {
                    if let Err(e) = self.sell(id).await {
                        error!(?e, item_id = id, "Failed to sell item");
                    }
                }
                Job::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }

        info!("Store worker stopped");
    }

    /// Decrements the row as stored now, not the caller's snapshot.
    async fn sell(&self, id: i64) -> AppResult<()> {
        let current = self
            .store
            .fetch_item(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        match current.sold_one() {
            Ok(sold) => Ok(self.store.update(&sold).await?),
            Err(e) => {
                debug!(%e, "Sale skipped, stock ran out");
                Ok(())
            }
        }
    }
}

// =============================================================================
// View-Model
// =============================================================================

/// Screen-facing operations over one [`ItemStore`].
///
/// Must be created inside a tokio runtime. Clones share the worker.
#[derive(Clone)]
pub struct InventoryViewModel {
    store: ItemStore,
    jobs: mpsc::UnboundedSender<Job>,
}

impl InventoryViewModel {
    /// Spawns the store worker and returns the view-model feeding it.
    pub fn new(store: ItemStore) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let worker = StoreWorker {
            store: store.clone(),
            jobs: jobs_rx,
        };
        tokio::spawn(worker.run());

        InventoryViewModel {
            store,
            jobs: jobs_tx,
        }
    }

    fn submit(&self, job: Job) {
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            error!(?job, "Store worker has stopped, job dropped");
        }
    }

    /// True when the add/edit form may be submitted.
    pub fn is_entry_valid(&self, entry: &ItemEntry) -> bool {
        validation::is_entry_valid(entry)
    }

    /// Queues a new form-entered item.
    pub fn add_new_item(&self, entry: &ItemEntry) -> ValidationResult<()> {
        let item = validate_entry(entry)?.into_item(ItemOrigin::Form);
        debug!(name = %item.name, "Queueing new item");
        self.submit(Job::Insert(item));
        Ok(())
    }

    /// Queues `item` amended with the form values. Identifier and origin are
    /// kept.
    pub fn update_item(&self, item: &Item, entry: &ItemEntry) -> ValidationResult<()> {
        let updated = validate_entry(entry)?.apply_to(item);
        debug!(item_id = updated.id, "Queueing item update");
        self.submit(Job::Update(updated));
        Ok(())
    }

    /// Queues one unit sold. Returns false, and queues nothing, when `item`
    /// shows no stock.
    ///
    /// The worker decrements the stored row, so several sales queued from
    /// the same snapshot each take one unit. A sale that reaches a row
    /// already at zero is skipped.
    pub fn sell_item(&self, item: &Item) -> bool {
        if !item.is_stock_available() {
            debug!(item_id = item.id, "Sale ignored, out of stock");
            return false;
        }

        debug!(item_id = item.id, "Queueing sale");
        self.submit(Job::Sell(item.id));
        true
    }

    pub fn delete_item(&self, item: &Item) {
        debug!(item_id = item.id, "Queueing delete");
        self.submit(Job::Delete(item.clone()));
    }

    #[inline]
    pub fn is_stock_available(&self, item: &Item) -> bool {
        item.is_stock_available()
    }

    /// Queues an item decoded from an import file, as a new record tagged
    /// [`ItemOrigin::File`]. It must pass the same checks as form input.
    pub fn add_imported_item(&self, item: Item) -> ValidationResult<()> {
        validate_item(&item)?;
        let item = item.as_new(ItemOrigin::File);
        debug!(name = %item.name, "Queueing imported item");
        self.submit(Job::Insert(item));
        Ok(())
    }

    /// Live view of one item (`None` while it does not exist).
    pub async fn retrieve_item<F>(&self, id: i64, observer: F) -> DbResult<Subscription>
    where
        F: Fn(Option<&Item>) + Send + Sync + 'static,
    {
        self.store.watch_item(id, observer).await
    }

    /// Live view of the whole inventory.
    pub async fn all_items<F>(&self, observer: F) -> DbResult<Subscription>
    where
        F: Fn(&[Item]) + Send + Sync + 'static,
    {
        self.store.watch_items(observer).await
    }

    /// Resolves once every job queued before this call has been applied.
    pub async fn idle(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(Job::Barrier(done_tx));
        let _ = done_rx.await;
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
