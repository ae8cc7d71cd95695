//! Erased keys.
//!
//! The dependency graph has no knowledge of the concrete types living in the
//! state tree. Field names, sequence indices and dictionary keys are all
//! flattened into [`Key`], which is hashable and comparable by value. This is
//! what lets the resolver compare the current value of a key expression with
//! a literal index in another path.

use std::fmt;
use std::sync::Arc;

/// A key addressing one child of a node in the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A named struct field.
    Field(&'static str),
    /// A position in a sequence.
    Index(usize),
    /// A signed integer dictionary key.
    Int(i64),
    /// An unsigned integer dictionary key.
    UInt(u64),
    /// A string dictionary key.
    Str(Arc<str>),
    /// A boolean dictionary key.
    Bool(bool),
    /// A character dictionary key.
    Char(char),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
            Key::Int(value) => write!(f, "{value}"),
            Key::UInt(value) => write!(f, "{value}"),
            Key::Str(value) => write!(f, "{value:?}"),
            Key::Bool(value) => write!(f, "{value}"),
            Key::Char(value) => write!(f, "{value:?}"),
        }
    }
}

/// A type that can be used to index a container in a path.
///
/// Implemented for the usual dictionary key types. Two keys of different
/// Rust types never compare equal once erased, except for the signed integer
/// family (all widen to `i64`) and the unsigned family (all widen to `u64`).
pub trait PathKey: Clone + PartialEq + Send + Sync + 'static {
    /// Erase the key into its graph representation.
    fn to_key(&self) -> Key;
}

impl PathKey for usize {
    fn to_key(&self) -> Key {
        Key::Index(*self)
    }
}

macro_rules! signed_path_key {
    ($($ty:ty),*) => {
        $(
            impl PathKey for $ty {
                fn to_key(&self) -> Key {
                    Key::Int(i64::from(*self))
                }
            }
        )*
    };
}

macro_rules! unsigned_path_key {
    ($($ty:ty),*) => {
        $(
            impl PathKey for $ty {
                fn to_key(&self) -> Key {
                    Key::UInt(u64::from(*self))
                }
            }
        )*
    };
}

signed_path_key!(i8, i16, i32, i64);
unsigned_path_key!(u8, u16, u32, u64);

impl PathKey for String {
    fn to_key(&self) -> Key {
        Key::Str(Arc::from(self.as_str()))
    }
}

impl PathKey for &'static str {
    fn to_key(&self) -> Key {
        Key::Str(Arc::from(*self))
    }
}

impl PathKey for Arc<str> {
    fn to_key(&self) -> Key {
        Key::Str(Arc::clone(self))
    }
}

impl PathKey for bool {
    fn to_key(&self) -> Key {
        Key::Bool(*self)
    }
}

impl PathKey for char {
    fn to_key(&self) -> Key {
        Key::Char(*self)
    }
}
