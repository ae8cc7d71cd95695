//! Typed Paths
//!
//! A [`Path`] describes how to reach a value inside the state tree. It is
//! built once per call site by chaining accessors onto [`Path::root`]:
//!
//! ```rust,ignore
//! let name = Path::<State, State>::root()
//!     .field("user", |s| &s.user, |s| &mut s.user)
//!     .some()
//!     .field("name", |u| &u.name, |u| &mut u.name);
//!
//! // `dict[user.name]`: the key is itself read from the state.
//! let by_name = Path::<State, State>::root()
//!     .field("dict", |s| &s.dict, |s| &mut s.dict)
//!     .at_path(&name);
//! ```
//!
//! Every builder step does two things: it appends a [`Segment`] describing
//! the step to the dependency graph, and it composes the compiled read,
//! read-mut and write closures. The graph only ever sees the segments; the
//! store only ever runs the closures.
//!
//! # Segment Grammar
//!
//! - `field`: a named field. Always tracked.
//! - `some`: unwraps an `Option`. Transparent to the graph.
//! - `at`: a literal key or index into a [`Container`].
//! - `at_path`: a key read from another path of the same state.
//! - `project`: an arbitrary read-only projection. Readable, but it cannot
//!   be tracked or written, so the store rejects it.

mod container;
mod key;

pub use container::{Container, ContainerKind, Rejection};
pub use key::{Key, PathKey};

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Result, StoreError};

type Reader<S, T> = Arc<dyn for<'a> Fn(&'a S) -> Option<&'a T> + Send + Sync>;
type ReaderMut<S, T> = Arc<dyn for<'a> Fn(&'a mut S) -> Option<&'a mut T> + Send + Sync>;
type Writer<S, T> = Arc<dyn Fn(&mut S, T) -> Result<()> + Send + Sync>;

/// Reads the current erased value of a key expression.
pub(crate) type Probe<S> = Arc<dyn Fn(&S) -> Option<Key> + Send + Sync>;

/// Inline capacity of segment lists. Most paths are a handful of steps deep.
pub(crate) type Segments<S> = SmallVec<[Segment<S>; 4]>;

// The helpers below exist so closures are checked against the
// higher-ranked signatures at the call site.

fn reader<S, T, F>(f: F) -> Reader<S, T>
where
    F: for<'a> Fn(&'a S) -> Option<&'a T> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn reader_mut<S, T, F>(f: F) -> ReaderMut<S, T>
where
    F: for<'a> Fn(&'a mut S) -> Option<&'a mut T> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn writer<S, T, F>(f: F) -> Writer<S, T>
where
    F: Fn(&mut S, T) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One step of a path.
pub enum Segment<S> {
    /// A named field.
    Field(&'static str),
    /// A literal container key.
    Key(Key),
    /// A container key read from another path.
    Dynamic(Arc<KeyPath<S>>),
    /// Transparent conversion (unwrapping an `Option`).
    Unwrap,
    /// A read-only projection outside the tracked grammar.
    Projection(&'static str),
}

impl<S> Clone for Segment<S> {
    fn clone(&self) -> Self {
        match self {
            Segment::Field(name) => Segment::Field(*name),
            Segment::Key(key) => Segment::Key(key.clone()),
            Segment::Dynamic(path) => Segment::Dynamic(Arc::clone(path)),
            Segment::Unwrap => Segment::Unwrap,
            Segment::Projection(label) => Segment::Projection(*label),
        }
    }
}

impl<S> fmt::Debug for Segment<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Segment::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Segment::Dynamic(path) => f.debug_tuple("Dynamic").field(&path.display).finish(),
            Segment::Unwrap => f.write_str("Unwrap"),
            Segment::Projection(label) => f.debug_tuple("Projection").field(label).finish(),
        }
    }
}

/// The erased form of a path used as a dynamic key.
pub struct KeyPath<S> {
    segments: Segments<S>,
    probe: Probe<S>,
    display: String,
}

impl<S> KeyPath<S> {
    /// The segments of the key expression.
    pub fn segments(&self) -> &[Segment<S>] {
        &self.segments
    }

    /// Evaluate the key expression against the state.
    pub fn key(&self, state: &S) -> Option<Key> {
        (self.probe)(state)
    }

    pub(crate) fn probe(&self) -> &Probe<S> {
        &self.probe
    }
}

impl<S> fmt::Display for KeyPath<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// A compiled path from the state root `S` to a value of type `T`.
pub struct Path<S, T> {
    segments: Segments<S>,
    display: String,
    read: Reader<S, T>,
    read_mut: ReaderMut<S, T>,
    write: Writer<S, T>,
}

impl<S, T> Clone for Path<S, T> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            display: self.display.clone(),
            read: Arc::clone(&self.read),
            read_mut: Arc::clone(&self.read_mut),
            write: Arc::clone(&self.write),
        }
    }
}

impl<S, T> fmt::Debug for Path<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("display", &self.display)
            .field("segments", &self.segments)
            .finish()
    }
}

impl<S, T> fmt::Display for Path<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.display)
        }
    }
}

impl<S: 'static> Path<S, S> {
    /// The path to the state root itself.
    pub fn root() -> Self {
        Self {
            segments: SmallVec::new(),
            display: String::new(),
            read: reader(|s: &S| Some(s)),
            read_mut: reader_mut(|s: &mut S| Some(s)),
            write: writer(|s: &mut S, value: S| {
                *s = value;
                Ok(())
            }),
        }
    }
}

impl<S: 'static, T: 'static> Path<S, T> {
    /// The ordered segments of this path.
    pub fn segments(&self) -> &[Segment<S>] {
        &self.segments
    }

    /// Read the value, or `None` if any link of the path is absent.
    pub fn read<'a>(&self, state: &'a S) -> Option<&'a T> {
        (self.read)(state)
    }

    /// Read the value mutably, or `None` if any link of the path is absent.
    ///
    /// Always `None` past a projection.
    pub fn read_mut<'a>(&self, state: &'a mut S) -> Option<&'a mut T> {
        (self.read_mut)(state)
    }

    /// Write `value` at the end of the path.
    ///
    /// Keyed paths write through the container (inserting into mappings)
    /// instead of requiring the slot to exist.
    pub fn write(&self, state: &mut S, value: T) -> Result<()> {
        (self.write)(state, value)
    }

    /// Check that every segment, including those of nested key
    /// expressions, belongs to the tracked grammar.
    pub fn validate(&self) -> Result<()> {
        fn first_projection<S>(segments: &[Segment<S>]) -> Option<&'static str> {
            segments.iter().find_map(|segment| match segment {
                Segment::Projection(label) => Some(*label),
                Segment::Dynamic(key) => first_projection(key.segments()),
                _ => None,
            })
        }

        match first_projection(&self.segments) {
            Some(label) => Err(StoreError::UnsupportedPathSegment {
                path: self.to_string(),
                segment: format!("{label}()"),
            }),
            None => Ok(()),
        }
    }

    fn child_display(&self, suffix: fmt::Arguments<'_>) -> String {
        if self.display.is_empty() {
            format!("{suffix}")
        } else {
            format!("{}{suffix}", self.display)
        }
    }

    /// Step into a field.
    pub fn field<U: 'static>(
        self,
        name: &'static str,
        get: impl for<'a> Fn(&'a T) -> &'a U + Send + Sync + 'static,
        get_mut: impl for<'a> Fn(&'a mut T) -> &'a mut U + Send + Sync + 'static,
    ) -> Path<S, U> {
        let display = if self.display.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.display)
        };

        let parent = self.read;
        let read = reader(move |s: &S| parent(s).map(|t| get(t)));

        let parent_mut = self.read_mut;
        let read_mut = reader_mut(move |s: &mut S| parent_mut(s).map(|t| get_mut(t)));

        let slot = Arc::clone(&read_mut);
        let path = display.clone();
        let write = writer(move |s: &mut S, value: U| match slot(s) {
            Some(target) => {
                *target = value;
                Ok(())
            }
            None => Err(StoreError::NullAccess { path: path.clone() }),
        });

        let mut segments = self.segments;
        segments.push(Segment::Field(name));

        Path {
            segments,
            display,
            read,
            read_mut,
            write,
        }
    }

    /// Step through a read-only projection.
    ///
    /// The projection can be read with [`Path::read`], but stores reject it
    /// because the graph cannot tell what it depends on.
    pub fn project<U: 'static>(
        self,
        label: &'static str,
        get: impl for<'a> Fn(&'a T) -> Option<&'a U> + Send + Sync + 'static,
    ) -> Path<S, U> {
        let display = self.child_display(format_args!(".{label}()"));

        let parent = self.read;
        let read = reader(move |s: &S| parent(s).and_then(|t| get(t)));
        let read_mut = reader_mut(|_: &mut S| None);

        let path = display.clone();
        let write = writer(move |_: &mut S, _: U| {
            Err(StoreError::UnsupportedPathSegment {
                path: path.clone(),
                segment: format!("{label}()"),
            })
        });

        let mut segments = self.segments;
        segments.push(Segment::Projection(label));

        Path {
            segments,
            display,
            read,
            read_mut,
            write,
        }
    }
}

impl<S: 'static, T: 'static> Path<S, Option<T>> {
    /// Step through an `Option`, treating `None` as an absent link.
    pub fn some(self) -> Path<S, T> {
        let display = self.display;

        let parent = self.read;
        let read = reader(move |s: &S| parent(s).and_then(|inner| inner.as_ref()));

        let parent_mut = self.read_mut;
        let read_mut = reader_mut(move |s: &mut S| parent_mut(s).and_then(|inner| inner.as_mut()));

        let slot = Arc::clone(&read_mut);
        let path = display.clone();
        let write = writer(move |s: &mut S, value: T| match slot(s) {
            Some(target) => {
                *target = value;
                Ok(())
            }
            None => Err(StoreError::NullAccess { path: path.clone() }),
        });

        let mut segments = self.segments;
        segments.push(Segment::Unwrap);

        Path {
            segments,
            display,
            read,
            read_mut,
            write,
        }
    }
}

impl<S: 'static, T: PathKey> Path<S, T> {
    /// Erase this path into a key expression.
    pub fn key_path(&self) -> KeyPath<S> {
        let read = Arc::clone(&self.read);
        KeyPath {
            segments: self.segments.clone(),
            probe: Arc::new(move |s: &S| read(s).map(PathKey::to_key)),
            display: self.display.clone(),
        }
    }
}

impl<S: 'static, C: Container + 'static> Path<S, C>
where
    C::Item: 'static,
{
    /// Index the container with a literal key.
    pub fn at(self, key: C::Key) -> Path<S, C::Item> {
        let erased = key.to_key();
        let display = self.child_display(format_args!("[{erased}]"));
        let segment = Segment::Key(erased.clone());

        let parent = self.read;
        let read_key = key.clone();
        let read = reader(move |s: &S| parent(s).and_then(|c| c.get(&read_key)));

        let parent_mut = self.read_mut;
        let container = Arc::clone(&parent_mut);
        let mut_key = key.clone();
        let read_mut = reader_mut(move |s: &mut S| parent_mut(s).and_then(|c| c.get_mut(&mut_key)));

        let path = display.clone();
        let write = writer(move |s: &mut S, value: C::Item| {
            let target = container(s).ok_or_else(|| StoreError::NullAccess { path: path.clone() })?;
            target
                .assign(key.clone(), value)
                .map_err(|rejection| rejection.into_error::<C>(&path, "set", &erased))
        });

        let mut segments = self.segments;
        segments.push(segment);

        Path {
            segments,
            display,
            read,
            read_mut,
            write,
        }
    }

    /// Index the container with a key read from another path.
    ///
    /// The key is re-read from the state every time this path is used, so
    /// the path follows the key when it changes.
    pub fn at_path(self, key: &Path<S, C::Key>) -> Path<S, C::Item> {
        let key_path = Arc::new(key.key_path());
        let display = self.child_display(format_args!("[{key_path}]"));

        let parent = self.read;
        let key_read = Arc::clone(&key.read);
        let read = reader(move |s: &S| {
            let key = key_read(s)?;
            parent(s)?.get(key)
        });

        let parent_mut = self.read_mut;
        let container = Arc::clone(&parent_mut);
        let key_read = Arc::clone(&key.read);
        let read_mut = reader_mut(move |s: &mut S| {
            let key = key_read(&*s)?.clone();
            parent_mut(s)?.get_mut(&key)
        });

        let key_read = Arc::clone(&key.read);
        let path = display.clone();
        let write = writer(move |s: &mut S, value: C::Item| {
            let key = key_read(&*s)
                .cloned()
                .ok_or_else(|| StoreError::NullKey { path: path.clone() })?;
            let erased = key.to_key();
            let target = container(s).ok_or_else(|| StoreError::NullAccess { path: path.clone() })?;
            target
                .assign(key, value)
                .map_err(|rejection| rejection.into_error::<C>(&path, "set", &erased))
        });

        let mut segments = self.segments;
        segments.push(Segment::Dynamic(key_path));

        Path {
            segments,
            display,
            read,
            read_mut,
            write,
        }
    }
}
