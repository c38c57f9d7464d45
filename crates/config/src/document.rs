//! The partitioned configuration document.
//!
//! Responsibilities:
//! - Define `ConfigDocument`, the mapping tree every codec produces and consumes.
//! - Answer partition lookups and enumerate the keys visible for an environment.
//!
//! Does NOT handle:
//! - Parsing or serializing bytes (see `codec`).
//! - Override resolution or protection (see `store`).
//!
//! Invariants:
//! - Partitions are flat: values are opaque and never descended into.
//! - `BTreeMap` ordering keeps serialized output deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// An opaque configuration value.
pub type ConfigValue = serde_json::Value;

/// A flat `key -> value` partition.
pub type Partition = BTreeMap<String, ConfigValue>;

/// A configuration document: one global partition plus named environment partitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    /// Environment-independent values.
    pub global: Partition,
    /// Values keyed by environment name.
    pub environments: BTreeMap<String, Partition>,
}

impl ConfigDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document holding only a global partition.
    pub fn from_global(global: Partition) -> Self {
        Self {
            global,
            environments: BTreeMap::new(),
        }
    }

    /// Builder-style helper that sets a global value.
    pub fn with_global(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.global.insert(key.into(), value);
        self
    }

    /// Builder-style helper that sets a value in an environment partition.
    pub fn with_env_value(
        mut self,
        env: impl Into<String>,
        key: impl Into<String>,
        value: ConfigValue,
    ) -> Self {
        self.environments
            .entry(env.into())
            .or_default()
            .insert(key.into(), value);
        self
    }

    /// Returns the partition for `env`, if the document defines one.
    pub fn environment(&self, env: &str) -> Option<&Partition> {
        self.environments.get(env)
    }

    /// Looks `key` up in the environment partition (when `env` is set), then globally.
    pub fn lookup(&self, env: Option<&str>, key: &str) -> Option<&ConfigValue> {
        env.and_then(|name| self.environment(name))
            .and_then(|partition| partition.get(key))
            .or_else(|| self.global.get(key))
    }

    /// Keys visible for `env`: the global partition plus that environment's partition.
    pub fn keys_for(&self, env: Option<&str>) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.global.keys().cloned().collect();
        if let Some(partition) = env.and_then(|name| self.environment(name)) {
            keys.extend(partition.keys().cloned());
        }
        keys
    }

    /// Returns true when the document holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.environments.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ConfigDocument {
        ConfigDocument::new()
            .with_global("theme", json!("light"))
            .with_global("endpoint", json!("global.example"))
            .with_env_value("PROD", "endpoint", json!("prod.example"))
            .with_env_value("DEV", "debug", json!(true))
    }

    #[test]
    fn test_lookup_prefers_environment_partition() {
        let doc = sample();
        assert_eq!(
            doc.lookup(Some("PROD"), "endpoint"),
            Some(&json!("prod.example"))
        );
        assert_eq!(
            doc.lookup(None, "endpoint"),
            Some(&json!("global.example"))
        );
    }

    #[test]
    fn test_lookup_unknown_environment_falls_through_to_global() {
        let doc = sample();
        assert_eq!(doc.lookup(Some("STAGING"), "theme"), Some(&json!("light")));
        assert_eq!(doc.lookup(Some("STAGING"), "debug"), None);
    }

    #[test]
    fn test_keys_for_merges_global_and_active_partition() {
        let doc = sample();
        let keys: Vec<_> = doc.keys_for(Some("DEV")).into_iter().collect();
        assert_eq!(keys, vec!["debug", "endpoint", "theme"]);

        let global_only: Vec<_> = doc.keys_for(None).into_iter().collect();
        assert_eq!(global_only, vec!["endpoint", "theme"]);
    }

    #[test]
    fn test_is_empty_ignores_empty_partitions() {
        let mut doc = ConfigDocument::new();
        doc.environments.insert("PROD".to_string(), Partition::new());
        assert!(doc.is_empty());
        assert!(!sample().is_empty());
    }
}
