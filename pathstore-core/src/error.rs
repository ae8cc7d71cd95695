//! Error types for the path store.
//!
//! Every failure is local and synchronous: it is returned to the caller of
//! the store operation that triggered it, and the operation leaves the state
//! untouched. Nothing is retried internally.

use thiserror::Error;

use crate::path::ContainerKind;

/// Errors returned by [`Store`](crate::Store) operations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The path runs through an absent value (a `None`, a missing entry or
    /// an index past the end of a sequence).
    #[error("Path `{path}` traverses an absent value")]
    NullAccess { path: String },

    /// A dynamic key expression produced no value during a write.
    #[error("Key expression in `{path}` produced no value")]
    NullKey { path: String },

    /// An entry was added under a key that already exists.
    #[error("Key {key} already exists in `{path}`")]
    DuplicateKey { path: String, key: String },

    /// A removal targeted a key that does not exist (strict removal only).
    #[error("Key {key} not found in `{path}`")]
    KeyNotFound { path: String, key: String },

    /// A removal targeted a value that is not in the collection (strict
    /// removal only).
    #[error("Value not found in `{path}`")]
    NotFound { path: String },

    /// The container at the path does not support the operation.
    #[error("Operation '{operation}' is not supported on the {kind} at `{path}`")]
    UnsupportedContainer {
        path: String,
        kind: ContainerKind,
        operation: &'static str,
    },

    /// The path contains a segment outside the tracked grammar.
    #[error("Segment '{segment}' in `{path}` cannot be tracked")]
    UnsupportedPathSegment { path: String, segment: String },

    /// A sequence slot was assigned past the end of the sequence.
    #[error("Index {index} is out of range for `{path}` (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

impl StoreError {
    /// Check if this error reports a missing key or value.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::KeyNotFound { .. } | StoreError::NotFound { .. }
        )
    }

    /// Check if this error is about a key rather than the path shape.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            StoreError::NullKey { .. }
                | StoreError::DuplicateKey { .. }
                | StoreError::KeyNotFound { .. }
        )
    }

    /// The display form of the path the error refers to.
    pub fn path(&self) -> &str {
        match self {
            StoreError::NullAccess { path }
            | StoreError::NullKey { path }
            | StoreError::DuplicateKey { path, .. }
            | StoreError::KeyNotFound { path, .. }
            | StoreError::NotFound { path }
            | StoreError::UnsupportedContainer { path, .. }
            | StoreError::UnsupportedPathSegment { path, .. }
            | StoreError::IndexOutOfRange { path, .. } => path,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = StoreError::NullAccess {
            path: "empty_user.name".into(),
        };
        assert_eq!(
            err.to_string(),
            "Path `empty_user.name` traverses an absent value"
        );
        assert_eq!(err.path(), "empty_user.name");
    }

    #[test]
    fn predicates() {
        let missing = StoreError::KeyNotFound {
            path: "dict".into(),
            key: "\"B\"".into(),
        };
        assert!(missing.is_not_found());
        assert!(missing.is_key_error());

        let unsupported = StoreError::UnsupportedContainer {
            path: "list".into(),
            kind: ContainerKind::Sequence,
            operation: "add_entry",
        };
        assert!(!unsupported.is_not_found());
        assert!(!unsupported.is_key_error());
        assert_eq!(
            unsupported.to_string(),
            "Operation 'add_entry' is not supported on the sequence at `list`"
        );
    }
}
