//! Subscriber types for the path store.
//!
//! A Subscriber is a callback registered against a path. It carries an
//! identity so that registering the same subscriber twice is idempotent and
//! so that it can be removed again with [`Store::unsubscribe`].
//!
//! [`Store::unsubscribe`]: crate::Store::unsubscribe

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Clones of a subscriber
/// share the ID, and the dependency graph deduplicates by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A callback to run when a subscribed path is invalidated.
///
/// Cloning is cheap and keeps the identity.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    /// The callback to invoke when a dependency changes.
    notify: Arc<dyn Fn() + Send + Sync>,
}

impl Subscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Arc::new(notify),
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that one of its dependencies changed.
    pub fn notify(&self) {
        (self.notify)();
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscriber").field(&self.id.0).finish()
    }
}

/// An ordered, deduplicated collection of subscribers to notify.
///
/// Subscribers fire in the order they were first added.
#[derive(Debug, Default)]
pub struct SubscriberSet {
    subscribers: IndexMap<SubscriberId, Subscriber>,
}

impl SubscriberSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn insert(&mut self, subscriber: &Subscriber) -> bool {
        if self.subscribers.contains_key(&subscriber.id) {
            return false;
        }
        self.subscribers.insert(subscriber.id, subscriber.clone());
        true
    }

    /// Add every subscriber yielded by `iter`.
    pub fn extend<'a>(&mut self, iter: impl IntoIterator<Item = &'a Subscriber>) {
        for subscriber in iter {
            self.insert(subscriber);
        }
    }

    /// Check if a subscriber with this ID is present.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Number of distinct subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Iterate over the subscribers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Subscriber> {
        self.subscribers.values()
    }

    /// Invoke every subscriber once, in order. Returns how many ran.
    ///
    /// The set is consumed, so callbacks are free to touch the store that
    /// produced it.
    pub fn notify_all(self) -> usize {
        let count = self.subscribers.len();
        for subscriber in self.subscribers.into_values() {
            subscriber.notify();
        }
        count
    }
}
