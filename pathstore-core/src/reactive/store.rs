//! Path Store
//!
//! The store owns the state tree and the dependency graph built over it.
//! Reads register subscribers against the node a path resolves to; writes
//! resolve the same path after mutating and notify everything that could
//! observe the change.
//!
//! # Firing Sets
//!
//! - `set(path)` notifies the dependency tree of the written node plus the
//!   indirect subscribers linked while resolving it.
//! - Collection operations notify the container's own subscribers, the
//!   dependency tree of the affected entry and the indirect subscribers
//!   linked while resolving the entry. Subscribers of sibling entries are
//!   left alone.
//!
//! # Re-entrancy
//!
//! The store lock is released before any callback runs, so callbacks may
//! read from, subscribe to and write to the store that notified them.

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::subscriber::{Subscriber, SubscriberSet};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::graph::{
    DependencyGraph, DependencyNode, NodeId, PathResolver, ProbeTable, Resolution, ResolveMode,
};
use crate::path::{Container, ContainerKind, Key, Path, PathKey, Rejection, Segment, Segments};

/// State and bookkeeping guarded by the store lock.
struct Inner<S> {
    state: S,
    graph: DependencyGraph,
    probes: ProbeTable<S>,
}

impl<S> Inner<S> {
    fn resolve(
        &mut self,
        segments: &[Segment<S>],
        mode: ResolveMode,
        path: &str,
    ) -> Result<Resolution> {
        PathResolver::new(&self.state, &mut self.graph, &mut self.probes, mode, path)
            .resolve(segments)
    }

    /// Register `subscriber` at the node of the path and on every key node
    /// the path went through.
    fn subscribe(
        &mut self,
        segments: &[Segment<S>],
        path: &str,
        subscriber: &Subscriber,
    ) -> Result<()> {
        let resolution = self.resolve(segments, ResolveMode::Subscribe, path)?;
        self.graph.subscribe(resolution.node, subscriber);
        for link in &resolution.links {
            self.graph.subscribe_indirect(link.key_node, link.container, subscriber);
        }
        Ok(())
    }

    /// Subscribers affected by a write to the value at the path.
    fn invalidate(&mut self, segments: &[Segment<S>], path: &str) -> Result<SubscriberSet> {
        let resolution = self.resolve(segments, ResolveMode::Invalidate, path)?;
        let mut fired = self.graph.dependency_tree(resolution.node);
        self.graph.collect_indirect(&resolution.links, &mut fired);
        Ok(fired)
    }

    /// Subscribers affected by adding or removing the entry `key` of the
    /// container at the path.
    fn invalidate_entry(
        &mut self,
        container: &[Segment<S>],
        key: Key,
        path: &str,
    ) -> Result<SubscriberSet> {
        let mut segments: Segments<S> = container.iter().cloned().collect();
        segments.push(Segment::Key(key));

        let resolution = self.resolve(&segments, ResolveMode::Invalidate, path)?;
        let mut fired = SubscriberSet::new();
        if let Some(parent) = self.graph.node(resolution.node).and_then(DependencyNode::parent) {
            self.graph.collect_direct(parent, &mut fired);
        }
        self.graph.collect_tree(resolution.node, &mut fired);
        self.graph.collect_indirect(&resolution.links, &mut fired);
        Ok(fired)
    }
}

/// A state tree with path-level change notification.
///
/// # Example
///
/// ```rust,ignore
/// let store = Store::new(State::default());
/// let name = Path::root()
///     .field("user", |s: &State| &s.user, |s| &mut s.user)
///     .some()
///     .field("name", |u| &u.name, |u| &mut u.name);
///
/// let rerender = Subscriber::new(|| println!("name changed"));
/// let current = store.get_or_default(&name, Some(&rerender))?;
///
/// store.set(&name, "Ada".to_string())?; // prints "name changed"
/// ```
pub struct Store<S> {
    inner: Mutex<Inner<S>>,
    config: StoreConfig,
}

impl<S: 'static> Store<S> {
    /// Create a store owning `state`, with the default configuration.
    pub fn new(state: S) -> Self {
        Self::with_config(state, StoreConfig::default())
    }

    /// Create a store owning `state`.
    pub fn with_config(state: S, config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                graph: DependencyGraph::new(),
                probes: ProbeTable::new(),
            }),
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Read the value at `path`.
    ///
    /// With a subscriber, the subscription is registered first, so it stays
    /// in place even when the read fails because a link is absent.
    ///
    /// # Errors
    ///
    /// [`StoreError::NullAccess`] if any link of the path is absent.
    pub fn get<T>(&self, path: &Path<S, T>, subscriber: Option<&Subscriber>) -> Result<T>
    where
        T: Clone + 'static,
    {
        path.validate()?;
        let shown = path.to_string();

        let mut inner = self.inner.lock();
        if let Some(subscriber) = subscriber {
            inner.subscribe(path.segments(), &shown, subscriber)?;
        }
        trace!(path = %shown, subscribed = subscriber.is_some(), "get");

        path.read(&inner.state)
            .cloned()
            .ok_or(StoreError::NullAccess { path: shown })
    }

    /// Read the value at `path`, or `T::default()` if a link is absent.
    pub fn get_or_default<T>(&self, path: &Path<S, T>, subscriber: Option<&Subscriber>) -> Result<T>
    where
        T: Clone + Default + 'static,
    {
        Ok(self.get_or_null(path, subscriber)?.unwrap_or_default())
    }

    /// Read the value at `path`, or `None` if a link is absent.
    ///
    /// The path is resolved even without a subscriber, so the nodes for a
    /// branch that does not exist yet are in place once it does.
    pub fn get_or_null<T>(
        &self,
        path: &Path<S, T>,
        subscriber: Option<&Subscriber>,
    ) -> Result<Option<T>>
    where
        T: Clone + 'static,
    {
        path.validate()?;
        let shown = path.to_string();

        let mut inner = self.inner.lock();
        match subscriber {
            Some(subscriber) => inner.subscribe(path.segments(), &shown, subscriber)?,
            None => {
                inner.resolve(path.segments(), ResolveMode::Subscribe, &shown)?;
            }
        }
        trace!(path = %shown, subscribed = subscriber.is_some(), "get_or_null");

        Ok(path.read(&inner.state).cloned())
    }

    /// Write `value` at `path` and notify affected subscribers.
    ///
    /// A keyed final segment writes through the container: mappings insert
    /// or replace, sequences replace an existing slot.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NullAccess`] if a link before the final segment is absent
    /// - [`StoreError::NullKey`] if a dynamic key produced no value
    /// - [`StoreError::IndexOutOfRange`] for a sequence slot past the end
    pub fn set<T: 'static>(&self, path: &Path<S, T>, value: T) -> Result<()> {
        path.validate()?;
        let shown = path.to_string();

        let fired = {
            let mut inner = self.inner.lock();
            path.write(&mut inner.state, value)?;
            inner.invalidate(path.segments(), &shown)?
        };

        let count = fired.notify_all();
        debug!(path = %shown, fired = count, "set");
        Ok(())
    }

    /// Add a new entry to the mapping at `path`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateKey`] if `key` is already present
    /// - [`StoreError::UnsupportedContainer`] if the container is a sequence
    pub fn add_entry<C>(&self, path: &Path<S, C>, key: C::Key, value: C::Item) -> Result<()>
    where
        C: Container + 'static,
    {
        path.validate()?;
        let shown = path.to_string();
        let erased = key.to_key();

        let fired = {
            let mut inner = self.inner.lock();
            let container = container_mut(path, &mut inner.state, &shown)?;
            container
                .insert(key, value)
                .map_err(|rejection| rejection.into_error::<C>(&shown, "add_entry", &erased))?;
            inner.invalidate_entry(path.segments(), erased.clone(), &shown)?
        };

        let count = fired.notify_all();
        debug!(path = %shown, key = %erased, fired = count, "add_entry");
        Ok(())
    }

    /// Append `value` to the sequence at `path`. Returns the index it was
    /// stored under.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnsupportedContainer`] if the container is a mapping.
    pub fn push<C>(&self, path: &Path<S, C>, value: C::Item) -> Result<C::Key>
    where
        C: Container + 'static,
    {
        path.validate()?;
        let shown = path.to_string();

        let (key, fired) = {
            let mut inner = self.inner.lock();
            let container = container_mut(path, &mut inner.state, &shown)?;
            let next = Key::Index(container.len());
            let key = container
                .push(value)
                .map_err(|rejection| rejection.into_error::<C>(&shown, "push", &next))?;
            let fired = inner.invalidate_entry(path.segments(), key.to_key(), &shown)?;
            (key, fired)
        };

        let count = fired.notify_all();
        debug!(path = %shown, key = %key.to_key(), fired = count, "push");
        Ok(key)
    }

    /// Remove the entry under `key` from the mapping at `path`.
    ///
    /// Returns `Ok(false)` if there was no such entry, unless the store uses
    /// [`RemovalPolicy::Strict`](crate::RemovalPolicy::Strict).
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnsupportedContainer`] if the container is a sequence
    /// - [`StoreError::KeyNotFound`] for an absent key under strict removal
    pub fn remove_entry<C>(&self, path: &Path<S, C>, key: &C::Key) -> Result<bool>
    where
        C: Container + 'static,
    {
        path.validate()?;
        let shown = path.to_string();
        let erased = key.to_key();

        if C::KIND != ContainerKind::Mapping {
            return Err(Rejection::Unsupported.into_error::<C>(&shown, "remove_entry", &erased));
        }

        let fired = {
            let mut inner = self.inner.lock();
            let container = container_mut(path, &mut inner.state, &shown)?;
            if !container.remove(key) {
                drop(inner);
                return self.absent(|| StoreError::KeyNotFound {
                    path: shown.clone(),
                    key: erased.to_string(),
                });
            }
            inner.invalidate_entry(path.segments(), erased.clone(), &shown)?
        };

        let count = fired.notify_all();
        debug!(path = %shown, key = %erased, fired = count, "remove_entry");
        Ok(true)
    }

    /// Remove the first item equal to `item` from the container at `path`.
    ///
    /// The affected position is located before removal. Items after it keep
    /// their subscriptions at their old positions.
    ///
    /// Returns `Ok(false)` if no item matched, unless the store uses
    /// [`RemovalPolicy::Strict`](crate::RemovalPolicy::Strict).
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an absent item under strict removal.
    pub fn remove_item<C>(&self, path: &Path<S, C>, item: &C::Item) -> Result<bool>
    where
        C: Container + 'static,
        C::Item: PartialEq,
    {
        path.validate()?;
        let shown = path.to_string();

        let (erased, fired) = {
            let mut inner = self.inner.lock();
            let container = container_mut(path, &mut inner.state, &shown)?;
            let Some(key) = container.index_of(item) else {
                drop(inner);
                return self.absent(|| StoreError::NotFound { path: shown.clone() });
            };
            container.remove(&key);

            let erased = key.to_key();
            let fired = inner.invalidate_entry(path.segments(), erased.clone(), &shown)?;
            (erased, fired)
        };

        let count = fired.notify_all();
        debug!(path = %shown, key = %erased, fired = count, "remove_item");
        Ok(true)
    }

    fn absent(&self, error: impl FnOnce() -> StoreError) -> Result<bool> {
        if self.config.strict_removal() {
            Err(error())
        } else {
            Ok(false)
        }
    }

    /// Remove every registration of `subscriber`. Returns how many there were.
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> usize {
        let removed = self.inner.lock().graph.unsubscribe(subscriber.id());
        debug!(subscriber = subscriber.id().raw(), removed, "unsubscribe");
        removed
    }

    /// Run `f` against the current state without subscribing to anything.
    ///
    /// `f` runs with the store lock held. Unlike subscriber callbacks, it
    /// must not call back into the store: the lock is not re-entrant and the
    /// call deadlocks.
    pub fn inspect<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Resolve `path` to its dependency node without subscribing.
    pub fn locate<T: 'static>(&self, path: &Path<S, T>) -> Result<NodeId> {
        path.validate()?;
        let shown = path.to_string();
        let resolution = self
            .inner
            .lock()
            .resolve(path.segments(), ResolveMode::Subscribe, &shown)?;
        Ok(resolution.node)
    }

    /// Consume the store and return the state.
    pub fn into_inner(self) -> S {
        self.inner.into_inner().state
    }

    /// Get the number of dependency nodes created so far.
    pub fn node_count(&self) -> usize {
        self.inner.lock().graph.node_count()
    }

    /// Get the total number of registrations.
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().graph.subscription_count()
    }
}

impl<S: Default + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

fn container_mut<'a, S: 'static, C: 'static>(
    path: &Path<S, C>,
    state: &'a mut S,
    shown: &str,
) -> Result<&'a mut C> {
    path.read_mut(state).ok_or_else(|| StoreError::NullAccess {
        path: shown.to_string(),
    })
}
