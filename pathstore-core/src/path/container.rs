//! Indexable containers.
//!
//! Keyed path segments dereference into a container. Rather than dispatching
//! on the concrete collection type at every step, every supported collection
//! implements [`Container`] and reports its [`ContainerKind`]. Operations that
//! only make sense for one kind (adding an entry under a key, appending an
//! item) are rejected by the other kind without touching it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

use super::key::{Key, PathKey};
use crate::error::StoreError;

/// The shape of an indexable container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Entries addressed by an arbitrary key (dictionaries).
    Mapping,
    /// Items addressed by position.
    Sequence,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Mapping => f.write_str("mapping"),
            ContainerKind::Sequence => f.write_str("sequence"),
        }
    }
}

/// Why a container refused a mutation. Nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The operation does not apply to this kind of container.
    Unsupported,
    /// The key is already present.
    Occupied,
    /// The index is past the end of the sequence.
    OutOfRange { index: usize, len: usize },
}

impl Rejection {
    /// Attach the path context of the refused operation.
    pub(crate) fn into_error<C: Container>(
        self,
        path: &str,
        operation: &'static str,
        key: &Key,
    ) -> StoreError {
        match self {
            Rejection::Unsupported => StoreError::UnsupportedContainer {
                path: path.to_string(),
                kind: C::KIND,
                operation,
            },
            Rejection::Occupied => StoreError::DuplicateKey {
                path: path.to_string(),
                key: key.to_string(),
            },
            Rejection::OutOfRange { index, len } => StoreError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len,
            },
        }
    }
}

/// A collection that keyed path segments can index into.
pub trait Container {
    /// The key type used to address items.
    type Key: PathKey;
    /// The stored item type.
    type Item;

    /// Whether this is a mapping or a sequence.
    const KIND: ContainerKind;

    /// Number of items.
    fn len(&self) -> usize;

    /// Check if the container holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an item.
    fn get(&self, key: &Self::Key) -> Option<&Self::Item>;

    /// Look up an item mutably.
    fn get_mut(&mut self, key: &Self::Key) -> Option<&mut Self::Item>;

    /// Check if an item exists under `key`.
    fn contains(&self, key: &Self::Key) -> bool {
        self.get(key).is_some()
    }

    /// Write through the indexer.
    ///
    /// Mappings insert or replace. Sequences replace an existing slot and
    /// reject indices at or past the end.
    fn assign(&mut self, key: Self::Key, item: Self::Item) -> Result<(), Rejection>;

    /// Insert a new entry, rejecting keys that already exist.
    fn insert(&mut self, key: Self::Key, item: Self::Item) -> Result<(), Rejection>;

    /// Append an item and return the key it was stored under.
    fn push(&mut self, item: Self::Item) -> Result<Self::Key, Rejection>;

    /// Remove the item under `key`. Returns `false` if there was none.
    fn remove(&mut self, key: &Self::Key) -> bool;

    /// Find the key of the first item equal to `item`.
    fn index_of(&self, item: &Self::Item) -> Option<Self::Key>
    where
        Self::Item: PartialEq;
}

impl<V> Container for Vec<V> {
    type Key = usize;
    type Item = V;

    const KIND: ContainerKind = ContainerKind::Sequence;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, key: &usize) -> Option<&V> {
        self.as_slice().get(*key)
    }

    fn get_mut(&mut self, key: &usize) -> Option<&mut V> {
        self.as_mut_slice().get_mut(*key)
    }

    fn assign(&mut self, key: usize, item: V) -> Result<(), Rejection> {
        let len = self.len();
        match self.as_mut_slice().get_mut(key) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(Rejection::OutOfRange { index: key, len }),
        }
    }

    fn insert(&mut self, _key: usize, _item: V) -> Result<(), Rejection> {
        Err(Rejection::Unsupported)
    }

    fn push(&mut self, item: V) -> Result<usize, Rejection> {
        Vec::push(self, item);
        Ok(self.len() - 1)
    }

    fn remove(&mut self, key: &usize) -> bool {
        if *key < self.len() {
            Vec::remove(self, *key);
            true
        } else {
            false
        }
    }

    fn index_of(&self, item: &V) -> Option<usize>
    where
        V: PartialEq,
    {
        self.iter().position(|candidate| candidate == item)
    }
}

impl<V> Container for VecDeque<V> {
    type Key = usize;
    type Item = V;

    const KIND: ContainerKind = ContainerKind::Sequence;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn get(&self, key: &usize) -> Option<&V> {
        VecDeque::get(self, *key)
    }

    fn get_mut(&mut self, key: &usize) -> Option<&mut V> {
        VecDeque::get_mut(self, *key)
    }

    fn assign(&mut self, key: usize, item: V) -> Result<(), Rejection> {
        let len = self.len();
        match VecDeque::get_mut(self, key) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(Rejection::OutOfRange { index: key, len }),
        }
    }

    fn insert(&mut self, _key: usize, _item: V) -> Result<(), Rejection> {
        Err(Rejection::Unsupported)
    }

    fn push(&mut self, item: V) -> Result<usize, Rejection> {
        self.push_back(item);
        Ok(self.len() - 1)
    }

    fn remove(&mut self, key: &usize) -> bool {
        VecDeque::remove(self, *key).is_some()
    }

    fn index_of(&self, item: &V) -> Option<usize>
    where
        V: PartialEq,
    {
        self.iter().position(|candidate| candidate == item)
    }
}

// The three mapping implementations only differ in the lookup bounds of the
// underlying map, so they share one body.
macro_rules! mapping_container {
    ($map:ident<K, V $(, $hasher:ident)?>, [$($bounds:tt)+], $remove:ident) => {
        impl<K, V $(, $hasher)?> Container for $map<K, V $(, $hasher)?>
        where
            K: PathKey + $($bounds)+,
            $($hasher: BuildHasher,)?
        {
            type Key = K;
            type Item = V;

            const KIND: ContainerKind = ContainerKind::Mapping;

            fn len(&self) -> usize {
                $map::len(self)
            }

            fn get(&self, key: &K) -> Option<&V> {
                $map::get(self, key)
            }

            fn get_mut(&mut self, key: &K) -> Option<&mut V> {
                $map::get_mut(self, key)
            }

            fn assign(&mut self, key: K, item: V) -> Result<(), Rejection> {
                $map::insert(self, key, item);
                Ok(())
            }

            fn insert(&mut self, key: K, item: V) -> Result<(), Rejection> {
                if $map::contains_key(self, &key) {
                    return Err(Rejection::Occupied);
                }
                $map::insert(self, key, item);
                Ok(())
            }

            fn push(&mut self, _item: V) -> Result<K, Rejection> {
                Err(Rejection::Unsupported)
            }

            fn remove(&mut self, key: &K) -> bool {
                $map::$remove(self, key).is_some()
            }

            fn index_of(&self, item: &V) -> Option<K>
            where
                V: PartialEq,
            {
                self.iter()
                    .find(|(_, candidate)| *candidate == item)
                    .map(|(key, _)| key.clone())
            }
        }
    };
}

mapping_container!(HashMap<K, V, H>, [Eq + Hash], remove);
mapping_container!(IndexMap<K, V, H>, [Eq + Hash], shift_remove);
mapping_container!(BTreeMap<K, V>, [Ord], remove);
