//! Store configuration.

use serde::{Deserialize, Serialize};

/// What a removal reports when its target is absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Report absence as `Ok(false)`.
    #[default]
    ReturnFalse,
    /// Report absence as [`StoreError::KeyNotFound`] or [`StoreError::NotFound`].
    ///
    /// [`StoreError::KeyNotFound`]: crate::StoreError::KeyNotFound
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    Strict,
}

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub removal: RemovalPolicy,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the removal policy.
    pub fn with_removal(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub(crate) fn strict_removal(&self) -> bool {
        self.removal == RemovalPolicy::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_returns_false() {
        assert_eq!(StoreConfig::new().removal, RemovalPolicy::ReturnFalse);
        assert!(!StoreConfig::new().strict_removal());
        assert!(StoreConfig::new()
            .with_removal(RemovalPolicy::Strict)
            .strict_removal());
    }

    #[test]
    fn removal_policy_serde() {
        let json = serde_json::to_string(&RemovalPolicy::ReturnFalse).unwrap();
        assert_eq!(json, "\"return_false\"");

        let config: StoreConfig = serde_json::from_str(r#"{"removal": "strict"}"#).unwrap();
        assert_eq!(config.removal, RemovalPolicy::Strict);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
    }
}
