//! Pathstore Core
//!
//! This crate provides a state store with path-level change notification.
//! It implements:
//!
//! - Typed paths into a state tree, including keys read from the state itself
//! - A dependency graph mirroring the touched parts of the tree
//! - Direct and indirect (dynamic-key) subscriptions
//! - Read, write and collection operations that notify exactly the affected
//!   subscribers
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `path`: Typed path builder, erased keys and container abstraction
//! - `graph`: Dependency nodes and the path resolver
//! - `reactive`: Subscribers and the store
//! - `config`: Store configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use pathstore_core::{Path, Store, Subscriber};
//!
//! let store = Store::new(State::default());
//! let dict = Path::root().field("dict", |s: &State| &s.dict, |s| &mut s.dict);
//! let name = Path::root()
//!     .field("user", |s: &State| &s.user, |s| &mut s.user)
//!     .some()
//!     .field("name", |u| &u.name, |u| &mut u.name);
//!
//! // Subscribe to whichever entry the user's name currently selects.
//! let entry = dict.clone().at_path(&name);
//! store.get_or_default(&entry, Some(&Subscriber::new(|| println!("entry changed"))))?;
//!
//! // Fires while the user's name is "A".
//! store.set(&dict.at("A".to_string()), "new".to_string())?;
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod path;
pub mod reactive;

pub use config::{RemovalPolicy, StoreConfig};
pub use error::{Result, StoreError};
pub use path::{Container, ContainerKind, Key, KeyPath, Path, PathKey, Segment};
pub use reactive::{Store, Subscriber, SubscriberId};
