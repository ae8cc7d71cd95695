//! Dependency Graph
//!
//! This module implements the tree of locations that subscriptions hang off.
//!
//! # Overview
//!
//! The dependency graph mirrors the shape of the state tree, but only the
//! parts of it that some path has touched:
//!
//! - Nodes represent one reachable location (`user`, `user.name`,
//!   `dict["A"]`, ...)
//! - Static edges connect a node to the child reached through a literal key
//! - Indirect edges connect a container node to the child reached through a
//!   dynamic key, and are keyed by the node of the key expression
//!
//! Invalidating a node invalidates everything below it, because replacing a
//! value replaces every value reachable from it.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena and refer to each other by [`NodeId`]. Parent
//!    links are plain handles, so there are no reference cycles to manage.
//!
//! 2. Nodes are created lazily and never removed. A handle obtained once stays
//!    valid for the lifetime of the graph.
//!
//! 3. The graph knows nothing about state values. Evaluating key expressions
//!    is the resolver's job.

mod node;
mod resolver;

pub use node::{DependencyNode, NodeId, NodeKey};
pub use resolver::{IndirectLink, PathResolver, ProbeTable, Resolution, ResolveMode};

use tracing::trace;

use crate::path::Key;
use crate::reactive::{Subscriber, SubscriberId, SubscriberSet};

/// The arena of dependency nodes, rooted at the state root.
#[derive(Debug)]
pub struct DependencyGraph {
    /// All nodes, indexed by `NodeId`.
    nodes: Vec<DependencyNode>,
}

impl DependencyGraph {
    /// Create a graph holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![DependencyNode::root()],
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.raw())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DependencyNode> {
        self.nodes.get_mut(id.raw())
    }

    fn push_node(&mut self, parent: NodeId, key: node::NodeKey) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(DependencyNode::new(id, Some(parent), key));
        id
    }

    /// Get or create the child of `parent` reached through `key`.
    pub fn child(&mut self, parent: NodeId, key: Key) -> NodeId {
        if let Some(existing) = self.node(parent).and_then(|node| node.child(&key)) {
            return existing;
        }

        let id = self.push_node(parent, NodeKey::Static(key.clone()));
        if let Some(node) = self.node_mut(parent) {
            node.add_child(key, id);
        }
        trace!(node = %id, path = %self.describe(id), "created dependency node");
        id
    }

    /// Get or create the child of `parent` reached through the dynamic key
    /// produced by `key_node`.
    pub fn indirect_child(&mut self, parent: NodeId, key_node: NodeId) -> NodeId {
        if let Some(existing) = self.node(parent).and_then(|node| node.indirect_child(key_node)) {
            return existing;
        }

        let id = self.push_node(parent, NodeKey::Indirect(key_node));
        if let Some(node) = self.node_mut(parent) {
            node.add_indirect_child(key_node, id);
        }
        trace!(node = %id, path = %self.describe(id), "created indirect dependency node");
        id
    }

    /// Key nodes of every indirect child of `parent`.
    pub fn indirect_key_nodes(&self, parent: NodeId) -> Vec<NodeId> {
        self.node(parent)
            .map(|node| node.indirect_children().map(|(key_node, _)| key_node).collect())
            .unwrap_or_default()
    }

    /// Register a subscriber directly at `node`.
    pub fn subscribe(&mut self, node: NodeId, subscriber: &Subscriber) -> bool {
        self.node_mut(node)
            .map(|node| node.subscribe(subscriber))
            .unwrap_or(false)
    }

    /// Register a subscriber on the key node of a dynamic key, remembering
    /// the container it indexed into.
    pub fn subscribe_indirect(
        &mut self,
        key_node: NodeId,
        container: NodeId,
        subscriber: &Subscriber,
    ) -> bool {
        self.node_mut(key_node)
            .map(|node| node.subscribe_indirect(subscriber, container))
            .unwrap_or(false)
    }

    /// Remove every registration of a subscriber. Returns how many there were.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> usize {
        self.nodes.iter_mut().map(|node| node.unsubscribe(id)).sum()
    }

    /// Add the subscribers registered directly at `node`.
    pub fn collect_direct(&self, node: NodeId, into: &mut SubscriberSet) {
        if let Some(node) = self.node(node) {
            into.extend(node.direct_subscribers());
        }
    }

    /// Add the dependency tree of `node`: every subscriber registered at the
    /// node or at any node below it, through static or indirect edges.
    pub fn collect_tree(&self, node: NodeId, into: &mut SubscriberSet) {
        let mut stack = vec![node];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            node.collect_own(into);

            // Push in reverse so children are visited in creation order.
            let mut below: Vec<NodeId> = node.children().map(|(_, child)| child).collect();
            below.extend(node.indirect_children().map(|(_, child)| child));
            stack.extend(below.into_iter().rev());
        }
    }

    /// The dependency tree of `node` as a fresh set.
    pub fn dependency_tree(&self, node: NodeId) -> SubscriberSet {
        let mut set = SubscriberSet::new();
        self.collect_tree(node, &mut set);
        set
    }

    /// Add the indirect subscribers behind each link.
    pub fn collect_indirect(&self, links: &[IndirectLink], into: &mut SubscriberSet) {
        for link in links {
            if let Some(node) = self.node(link.key_node) {
                node.collect_indirect_for(link.container, into);
            }
        }
    }

    /// Human-readable location of a node, e.g. `dict["A"]` or `dict[#3]`
    /// for a child reached through the dynamic key produced by node 3.
    pub fn describe(&self, id: NodeId) -> String {
        let mut keys = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            match node.key() {
                NodeKey::Root => break,
                key => keys.push(key.clone()),
            }
            current = node.parent().and_then(|parent| self.node(parent));
        }

        let mut out = String::new();
        for key in keys.iter().rev() {
            match key {
                NodeKey::Static(Key::Field(name)) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                NodeKey::Static(key) => out.push_str(&format!("[{key}]")),
                NodeKey::Indirect(key_node) => out.push_str(&format!("[{key_node}]")),
                NodeKey::Root => {}
            }
        }

        if out.is_empty() {
            out.push_str("<root>");
        }
        out
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the total number of registrations across all nodes.
    pub fn subscription_count(&self) -> usize {
        self.nodes.iter().map(DependencyNode::subscription_count).sum()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
