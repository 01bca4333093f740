//! # Change Feed
//!
//! Observer registry behind the store's live views.
//!
//! ```text
//! watch_items(cb) ──► ChangeFeed::register ──► Subscription (handle)
//!                                                   │
//! store mutation ──► ChangeFeed::publish(&items)    │ cancel() / drop
//!                       │                           ▼
//!                       ├──► All(cb)(&items)     observer removed,
//!                       └──► One{id}(cb)(item)   no further calls
//! ```
//!
//! Callbacks run synchronously on the publishing task, after the registry
//! lock is released, so a callback may cancel subscriptions or register new
//! ones without deadlocking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use inventory_core::Item;

/// Callback for the all-items view.
pub type ItemsObserver = Arc<dyn Fn(&[Item]) + Send + Sync>;

/// Callback for a single-item view; `None` once the item is gone.
pub type ItemObserver = Arc<dyn Fn(Option<&Item>) + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Observer {
    All(ItemsObserver),
    One { id: i64, callback: ItemObserver },
}

impl Observer {
    pub(crate) fn deliver(&self, items: &[Item]) {
        match self {
            Observer::All(callback) => callback(items),
            Observer::One { id, callback } => callback(items.iter().find(|item| item.id == *id)),
        }
    }
}

/// Registry of active observers.
#[derive(Default)]
pub struct ChangeFeed {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<u64, Observer>>,
}

impl ChangeFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(ChangeFeed::default())
    }

    pub(crate) fn register(self: &Arc<Self>, observer: Observer) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, observer);

        Subscription {
            id,
            feed: Arc::downgrade(self),
        }
    }

    /// Delivers a fresh snapshot to every registered observer.
    pub fn publish(&self, items: &[Item]) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for observer in &observers {
            observer.deliver(items);
        }
    }

    /// Number of active observers.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) -> bool {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    fn contains(&self, id: u64) -> bool {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("observers", &self.len())
            .finish()
    }
}

/// Handle for a live view. Dropping it cancels the subscription.
#[must_use = "dropping a Subscription cancels it immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    feed: Weak<ChangeFeed>,
}

impl Subscription {
    /// Stops delivery. Equivalent to dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }

    /// True while the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.feed
            .upgrade()
            .map(|feed| feed.contains(self.id))
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.remove(self.id);
        }
    }
}
