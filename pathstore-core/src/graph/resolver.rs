//! Path Resolver
//!
//! The resolver walks the segments of a path against the live state and
//! returns the dependency node the path lands on, creating nodes as needed.
//!
//! # Algorithm
//!
//! Resolution starts at the root node and steps through the segments:
//!
//! 1. A field steps to the static child named after the field.
//! 2. An unwrap is transparent and stays on the current node.
//! 3. A literal key steps to the static child for that key.
//! 4. A dynamic key first resolves its own key expression (recursively, with
//!    the same mode) to find the *key node*, then steps according to the
//!    mode:
//!    - **Subscribe**: to the indirect child keyed by the key node. The
//!      subscription is pinned to "whatever this key expression points at",
//!      and `(key_node, container)` is recorded as an indirect link so that
//!      changing the key reaches the subscriber.
//!    - **Invalidate**: to the static child for the key's *current value*.
//! 5. In invalidate mode every keyed step (literal or dynamic) also scans
//!    the container's indirect children for key nodes whose current value
//!    equals the key, and records each as an indirect link. This is what
//!    lets a write to `dict["A"]` reach a subscriber of `dict[user.name]`
//!    while `user.name == "A"`, and stop reaching it once the name changes.
//!
//! Subscribing keys by node identity tolerates keys that do not exist yet;
//! invalidating by value tolerates keys that have just changed.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use super::{DependencyGraph, NodeId};
use crate::error::{Result, StoreError};
use crate::path::{Key, KeyPath, Probe, Segment};

/// The two resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Used when registering a dependency.
    Subscribe,
    /// Used after a mutation to decide who to notify.
    Invalidate,
}

/// A dynamic-key relationship discovered during resolution: `key_node`
/// produced (or currently evaluates to) the key used to index `container`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndirectLink {
    pub key_node: NodeId,
    pub container: NodeId,
}

/// The outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The node the path lands on.
    pub node: NodeId,
    /// Indirect links discovered along the way, in discovery order.
    pub links: SmallVec<[IndirectLink; 2]>,
}

/// How to re-evaluate each key node's current value.
///
/// Registered the first time a key node is resolved as part of a dynamic key
/// and consulted by invalidate-mode scans.
pub struct ProbeTable<S> {
    probes: HashMap<NodeId, Probe<S>>,
}

impl<S> ProbeTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
        }
    }

    fn register(&mut self, key_node: NodeId, key_path: &KeyPath<S>) {
        self.probes
            .entry(key_node)
            .or_insert_with(|| Arc::clone(key_path.probe()));
    }

    /// Evaluate the key node against `state`.
    pub fn evaluate(&self, key_node: NodeId, state: &S) -> Option<Key> {
        self.probes.get(&key_node).and_then(|probe| probe(state))
    }

    /// Number of registered key nodes.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Check if no key node has been registered.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl<S> Default for ProbeTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks path segments against the state, producing dependency nodes.
pub struct PathResolver<'a, S> {
    state: &'a S,
    graph: &'a mut DependencyGraph,
    probes: &'a mut ProbeTable<S>,
    mode: ResolveMode,
    /// Display form of the path being resolved, for error context.
    path: &'a str,
    links: SmallVec<[IndirectLink; 2]>,
}

impl<'a, S> PathResolver<'a, S> {
    /// Create a resolver over the given state and graph.
    pub fn new(
        state: &'a S,
        graph: &'a mut DependencyGraph,
        probes: &'a mut ProbeTable<S>,
        mode: ResolveMode,
        path: &'a str,
    ) -> Self {
        Self {
            state,
            graph,
            probes,
            mode,
            path,
            links: SmallVec::new(),
        }
    }

    /// Resolve `segments` from the root.
    pub fn resolve(mut self, segments: &[Segment<S>]) -> Result<Resolution> {
        let node = self.walk(segments)?;
        trace!(
            path = self.path,
            mode = ?self.mode,
            node = %node,
            links = self.links.len(),
            "resolved path"
        );
        Ok(Resolution {
            node,
            links: self.links,
        })
    }

    fn walk(&mut self, segments: &[Segment<S>]) -> Result<NodeId> {
        let mut node = self.graph.root();

        for segment in segments {
            node = match segment {
                Segment::Field(name) => self.graph.child(node, Key::Field(*name)),
                Segment::Unwrap => node,
                Segment::Key(key) => {
                    if self.mode == ResolveMode::Invalidate {
                        self.link_matching(node, key);
                    }
                    self.graph.child(node, key.clone())
                }
                Segment::Dynamic(key_path) => self.step_dynamic(node, key_path)?,
                Segment::Projection(label) => {
                    return Err(StoreError::UnsupportedPathSegment {
                        path: self.path.to_string(),
                        segment: format!("{label}()"),
                    })
                }
            };
        }

        Ok(node)
    }

    fn step_dynamic(&mut self, container: NodeId, key_path: &KeyPath<S>) -> Result<NodeId> {
        let key_node = self.walk(key_path.segments())?;
        self.probes.register(key_node, key_path);

        match self.mode {
            ResolveMode::Subscribe => {
                self.link(key_node, container);
                Ok(self.graph.indirect_child(container, key_node))
            }
            ResolveMode::Invalidate => match key_path.key(self.state) {
                Some(key) => {
                    self.link_matching(container, &key);
                    Ok(self.graph.child(container, key))
                }
                // The key has no value to follow; stay with the relationship.
                None => {
                    self.link(key_node, container);
                    Ok(self.graph.indirect_child(container, key_node))
                }
            },
        }
    }

    /// Record every key node indexing `container` whose current value is `key`.
    fn link_matching(&mut self, container: NodeId, key: &Key) {
        for key_node in self.graph.indirect_key_nodes(container) {
            if self.probes.evaluate(key_node, self.state).as_ref() == Some(key) {
                self.link(key_node, container);
            }
        }
    }

    fn link(&mut self, key_node: NodeId, container: NodeId) {
        let link = IndirectLink {
            key_node,
            container,
        };
        if !self.links.contains(&link) {
            trace!(key_node = %key_node, container = %container, "indirect link");
            self.links.push(link);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{Path, PathKey};
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct User {
        name: String,
    }

    #[derive(Debug, Default)]
    struct State {
        user: Option<User>,
        dict: HashMap<String, String>,
        list: Vec<String>,
    }

    fn root() -> Path<State, State> {
        Path::root()
    }

    fn user_name() -> Path<State, String> {
        root()
            .field("user", |s| &s.user, |s| &mut s.user)
            .some()
            .field("name", |u| &u.name, |u| &mut u.name)
    }

    fn dict() -> Path<State, HashMap<String, String>> {
        root().field("dict", |s| &s.dict, |s| &mut s.dict)
    }

    fn state_named(name: &str) -> State {
        State {
            user: Some(User { name: name.into() }),
            ..State::default()
        }
    }

    struct Fixture {
        graph: DependencyGraph,
        probes: ProbeTable<State>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: DependencyGraph::new(),
                probes: ProbeTable::new(),
            }
        }

        fn resolve<T: 'static>(
            &mut self,
            state: &State,
            path: &Path<State, T>,
            mode: ResolveMode,
        ) -> Resolution {
            let display = path.to_string();
            PathResolver::new(state, &mut self.graph, &mut self.probes, mode, &display)
                .resolve(path.segments())
                .unwrap()
        }
    }

    #[test]
    fn static_paths_resolve_to_the_same_node() {
        let state = State::default();
        let mut fixture = Fixture::new();

        let first = fixture.resolve(&state, &user_name(), ResolveMode::Subscribe);
        let second = fixture.resolve(&state, &user_name(), ResolveMode::Invalidate);

        assert_eq!(first.node, second.node);
        assert!(first.links.is_empty());
        // root, user, user.name
        assert_eq!(fixture.graph.node_count(), 3);
    }

    #[test]
    fn unwrap_is_transparent() {
        let state = State::default();
        let mut fixture = Fixture::new();

        let user = root().field("user", |s| &s.user, |s| &mut s.user);
        let unwrapped = user.clone().some();

        let a = fixture.resolve(&state, &user, ResolveMode::Subscribe);
        let b = fixture.resolve(&state, &unwrapped, ResolveMode::Subscribe);
        assert_eq!(a.node, b.node);
    }

    #[test]
    fn subscribe_mode_keys_dynamic_children_by_node() {
        let state = state_named("Test");
        let mut fixture = Fixture::new();

        let by_name = dict().at_path(&user_name());
        let resolution = fixture.resolve(&state, &by_name, ResolveMode::Subscribe);

        let name_node = fixture.resolve(&state, &user_name(), ResolveMode::Subscribe).node;
        let dict_node = fixture.resolve(&state, &dict(), ResolveMode::Subscribe).node;

        assert_eq!(
            resolution.links.as_slice(),
            &[IndirectLink {
                key_node: name_node,
                container: dict_node
            }]
        );
        let dict_entry = fixture.graph.node(dict_node).unwrap();
        assert_eq!(dict_entry.indirect_child(name_node), Some(resolution.node));
        assert_eq!(dict_entry.child(&"Test".to_string().to_key()), None);
        assert_eq!(fixture.probes.len(), 1);
    }

    #[test]
    fn invalidate_mode_follows_the_key_value() {
        let state = state_named("Test");
        let mut fixture = Fixture::new();

        let by_name = dict().at_path(&user_name());
        let literal = dict().at("Test".to_string());

        let subscribed = fixture.resolve(&state, &by_name, ResolveMode::Subscribe);
        let invalidated = fixture.resolve(&state, &by_name, ResolveMode::Invalidate);
        let literal_node = fixture.resolve(&state, &literal, ResolveMode::Subscribe).node;

        assert_ne!(subscribed.node, invalidated.node);
        assert_eq!(invalidated.node, literal_node);
        assert_eq!(invalidated.links, subscribed.links);
    }

    #[test]
    fn invalidate_mode_links_aliasing_keys() {
        let mut state = state_named("Test");
        let mut fixture = Fixture::new();

        fixture.resolve(&state, &dict().at_path(&user_name()), ResolveMode::Subscribe);

        let literal = dict().at("Test".to_string());
        let aliased = fixture.resolve(&state, &literal, ResolveMode::Invalidate);
        assert_eq!(aliased.links.len(), 1);

        state.user = Some(User { name: "A".into() });
        let stale = fixture.resolve(&state, &literal, ResolveMode::Invalidate);
        assert!(stale.links.is_empty());

        let fresh = fixture.resolve(&state, &dict().at("A".to_string()), ResolveMode::Invalidate);
        assert_eq!(fresh.links, aliased.links);
    }

    #[test]
    fn subscribe_mode_ignores_aliasing_keys() {
        let state = state_named("Test");
        let mut fixture = Fixture::new();

        fixture.resolve(&state, &dict().at_path(&user_name()), ResolveMode::Subscribe);
        let literal = fixture.resolve(
            &state,
            &dict().at("Test".to_string()),
            ResolveMode::Subscribe,
        );
        assert!(literal.links.is_empty());
    }

    #[test]
    fn absent_key_falls_back_to_the_relationship() {
        let state = State::default();
        let mut fixture = Fixture::new();

        let by_name = dict().at_path(&user_name());
        let subscribed = fixture.resolve(&state, &by_name, ResolveMode::Subscribe);
        let invalidated = fixture.resolve(&state, &by_name, ResolveMode::Invalidate);

        assert_eq!(subscribed.node, invalidated.node);
        assert_eq!(invalidated.links.len(), 1);
    }

    #[test]
    fn projections_are_rejected() {
        let state = State::default();
        let mut fixture = Fixture::new();

        let first = root()
            .field("list", |s| &s.list, |s| &mut s.list)
            .project("first", |l| l.first());
        let display = first.to_string();

        let err = PathResolver::new(
            &state,
            &mut fixture.graph,
            &mut fixture.probes,
            ResolveMode::Subscribe,
            &display,
        )
        .resolve(first.segments())
        .unwrap_err();

        assert_eq!(
            err,
            StoreError::UnsupportedPathSegment {
                path: "list.first()".into(),
                segment: "first()".into()
            }
        );
    }
}
