//! Change Notification
//!
//! This module holds the parts of the system that callers interact with: the
//! [`Store`] that owns the state and the [`Subscriber`] callbacks it notifies.
//!
//! # Concepts
//!
//! ## Subscribers
//!
//! A Subscriber is a callback with an identity. Reading a path with a
//! subscriber registers it against that path; the same subscriber may be
//! registered against any number of paths and is notified at most once per
//! mutation.
//!
//! ## Invalidation
//!
//! After a mutation the store re-resolves the written path against the new
//! state and notifies every subscriber that could observe the change:
//! subscribers of the written location, of anything below it, and of any
//! dynamic key expression that currently points at it.

mod store;
mod subscriber;

pub use store::Store;
pub use subscriber::{Subscriber, SubscriberId, SubscriberSet};
