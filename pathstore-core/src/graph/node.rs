//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency graph.
//! One node exists per distinct location reachable in the state tree.

use std::fmt;

use indexmap::IndexMap;

use crate::path::Key;
use crate::reactive::{Subscriber, SubscriberId, SubscriberSet};

/// Handle of a node in the dependency graph.
///
/// Handles are indices into the graph's arena. They stay valid for the
/// lifetime of the graph because nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node, present in every graph.
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a node is attached to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// The state root. Has no parent.
    Root,

    /// Reached through a literal key: a field name, an index, or a
    /// dictionary key.
    Static(Key),

    /// Reached through a dynamic key. Holds the node of the key expression,
    /// not the value it evaluated to.
    Indirect(NodeId),
}

/// A node in the dependency graph.
#[derive(Debug)]
pub struct DependencyNode {
    /// Handle of this node.
    id: NodeId,

    /// Owning node. `None` only for the root.
    parent: Option<NodeId>,

    /// The key this node hangs under in its parent.
    key: NodeKey,

    /// Children reached through literal keys.
    children: IndexMap<Key, NodeId>,

    /// Children reached through dynamic keys, keyed by the key-producing node.
    indirect_children: IndexMap<NodeId, NodeId>,

    /// Subscribers registered exactly at this node.
    direct: IndexMap<SubscriberId, Subscriber>,

    /// Subscribers whose path used this node as a dynamic key, tagged with
    /// the container node the key indexed into.
    indirect: IndexMap<(SubscriberId, NodeId), Subscriber>,
}

impl DependencyNode {
    pub(crate) fn root() -> Self {
        Self::new(NodeId::ROOT, None, NodeKey::Root)
    }

    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, key: NodeKey) -> Self {
        Self {
            id,
            parent,
            key,
            children: IndexMap::new(),
            indirect_children: IndexMap::new(),
            direct: IndexMap::new(),
            indirect: IndexMap::new(),
        }
    }

    /// Get the node's handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the owning node, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Get the key this node hangs under.
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// Look up a child reached through a literal key.
    pub fn child(&self, key: &Key) -> Option<NodeId> {
        self.children.get(key).copied()
    }

    /// Look up a child reached through the dynamic key produced by `key_node`.
    pub fn indirect_child(&self, key_node: NodeId) -> Option<NodeId> {
        self.indirect_children.get(&key_node).copied()
    }

    /// Children reached through literal keys, in creation order.
    pub fn children(&self) -> impl Iterator<Item = (&Key, NodeId)> {
        self.children.iter().map(|(key, id)| (key, *id))
    }

    /// Children reached through dynamic keys, as `(key_node, child)` pairs.
    pub fn indirect_children(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.indirect_children.iter().map(|(key, id)| (*key, *id))
    }

    pub(crate) fn add_child(&mut self, key: Key, child: NodeId) {
        self.children.insert(key, child);
    }

    pub(crate) fn add_indirect_child(&mut self, key_node: NodeId, child: NodeId) {
        self.indirect_children.insert(key_node, child);
    }

    /// Register a subscriber at this node. Returns `false` if it already was.
    pub(crate) fn subscribe(&mut self, subscriber: &Subscriber) -> bool {
        if self.direct.contains_key(&subscriber.id()) {
            return false;
        }
        self.direct.insert(subscriber.id(), subscriber.clone());
        true
    }

    /// Register a subscriber that reached `container` through a dynamic key
    /// produced by this node.
    pub(crate) fn subscribe_indirect(
        &mut self,
        subscriber: &Subscriber,
        container: NodeId,
    ) -> bool {
        let slot = (subscriber.id(), container);
        if self.indirect.contains_key(&slot) {
            return false;
        }
        self.indirect.insert(slot, subscriber.clone());
        true
    }

    /// Drop every registration of `id`. Returns how many were removed.
    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) -> usize {
        let before = self.subscription_count();
        self.direct.shift_remove(&id);
        self.indirect.retain(|(subscriber, _), _| *subscriber != id);
        before - self.subscription_count()
    }

    /// Subscribers registered exactly at this node.
    pub fn direct_subscribers(&self) -> impl Iterator<Item = &Subscriber> {
        self.direct.values()
    }

    /// Indirect subscribers as `(subscriber, container)` pairs.
    pub fn indirect_subscribers(&self) -> impl Iterator<Item = (&Subscriber, NodeId)> {
        self.indirect
            .iter()
            .map(|((_, container), subscriber)| (subscriber, *container))
    }

    /// Add the indirect subscribers that went through `container`.
    pub(crate) fn collect_indirect_for(&self, container: NodeId, into: &mut SubscriberSet) {
        into.extend(
            self.indirect_subscribers()
                .filter(|(_, through)| *through == container)
                .map(|(subscriber, _)| subscriber),
        );
    }

    /// Add every subscriber registered at this node, direct or indirect.
    pub(crate) fn collect_own(&self, into: &mut SubscriberSet) {
        into.extend(self.direct.values());
        into.extend(self.indirect.values());
    }

    /// Number of registrations held by this node.
    pub fn subscription_count(&self) -> usize {
        self.direct.len() + self.indirect.len()
    }

    /// Check if the node has no children of either kind.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.indirect_children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent() {
        let node = DependencyNode::root();
        assert_eq!(node.id(), NodeId::ROOT);
        assert_eq!(node.parent(), None);
        assert_eq!(node.key(), &NodeKey::Root);
        assert!(node.is_leaf());
    }

    #[test]
    fn child_management() {
        let mut node = DependencyNode::root();
        let static_child = NodeId::from_index(1);
        let key_node = NodeId::from_index(2);
        let indirect_child = NodeId::from_index(3);

        node.add_child(Key::Field("user"), static_child);
        node.add_indirect_child(key_node, indirect_child);

        assert_eq!(node.child(&Key::Field("user")), Some(static_child));
        assert_eq!(node.child(&Key::Field("url")), None);
        assert_eq!(node.indirect_child(key_node), Some(indirect_child));
        assert_eq!(node.children().count(), 1);
        assert_eq!(
            node.indirect_children().collect::<Vec<_>>(),
            vec![(key_node, indirect_child)]
        );
        assert!(!node.is_leaf());
    }

    #[test]
    fn subscriptions_are_idempotent() {
        let mut node = DependencyNode::root();
        let subscriber = Subscriber::new(|| {});
        let container = NodeId::from_index(4);

        assert!(node.subscribe(&subscriber));
        assert!(!node.subscribe(&subscriber.clone()));
        assert!(node.subscribe_indirect(&subscriber, container));
        assert!(!node.subscribe_indirect(&subscriber, container));
        assert!(node.subscribe_indirect(&subscriber, NodeId::from_index(5)));

        assert_eq!(node.subscription_count(), 3);
        assert_eq!(node.direct_subscribers().count(), 1);
    }

    #[test]
    fn indirect_collection_filters_by_container() {
        let mut node = DependencyNode::root();
        let first = Subscriber::new(|| {});
        let second = Subscriber::new(|| {});
        let dict = NodeId::from_index(1);
        let list = NodeId::from_index(2);

        node.subscribe_indirect(&first, dict);
        node.subscribe_indirect(&second, list);

        let mut set = SubscriberSet::new();
        node.collect_indirect_for(dict, &mut set);
        assert_eq!(set.len(), 1);
        assert!(set.contains(first.id()));

        let mut own = SubscriberSet::new();
        node.collect_own(&mut own);
        assert_eq!(own.len(), 2);
    }

    #[test]
    fn unsubscribe_removes_every_registration() {
        let mut node = DependencyNode::root();
        let subscriber = Subscriber::new(|| {});
        let other = Subscriber::new(|| {});

        node.subscribe(&subscriber);
        node.subscribe(&other);
        node.subscribe_indirect(&subscriber, NodeId::from_index(1));
        node.subscribe_indirect(&subscriber, NodeId::from_index(2));

        assert_eq!(node.unsubscribe(subscriber.id()), 3);
        assert_eq!(node.unsubscribe(subscriber.id()), 0);
        assert_eq!(node.subscription_count(), 1);
    }
}
