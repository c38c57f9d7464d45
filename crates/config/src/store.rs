//! The in-memory configuration store.
//!
//! Responsibilities:
//! - Hold the base document, the active environment, the protection set and
//!   the override layer.
//! - Resolve reads: override layer, then environment partition, then global partition.
//! - Gate every write on the protection set.
//!
//! Does NOT handle:
//! - Loading or flushing the override layer (see `persistence`).
//! - Locking (see `facade`).
//!
//! Invariants:
//! - `set` is the only code path that inserts into the override layer, and it
//!   checks protection first.
//! - Writes to protected keys are dropped silently.
//! - Changing the environment never alters stored data.

use std::collections::BTreeSet;

use crate::document::{ConfigDocument, ConfigValue, Partition};

/// Base document, environment selection, protection set and override layer.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    document: ConfigDocument,
    environment: Option<String>,
    protected: BTreeSet<String>,
    overrides: Partition,
    persistent: bool,
}

impl ConfigStore {
    /// Creates a store over `document` with an empty override layer.
    pub fn new(document: ConfigDocument) -> Self {
        Self::with_overrides(document, Partition::new())
    }

    /// Creates a store over `document` with a previously persisted override layer.
    pub fn with_overrides(document: ConfigDocument, overrides: Partition) -> Self {
        Self {
            document,
            environment: None,
            protected: BTreeSet::new(),
            overrides,
            persistent: true,
        }
    }

    /// Selects the active environment. Unknown names are accepted.
    pub fn set_env(&mut self, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!(environment = %name, "Environment selected");
        self.environment = Some(name);
    }

    /// Returns the active environment, if one was selected.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Resolves `key` against the override layer, the active environment and the global partition.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.overrides
            .get(key)
            .or_else(|| self.document.lookup(self.environment(), key))
    }

    /// The merged view for the active environment, overrides winning.
    pub fn resolved(&self) -> Partition {
        let mut view = self.document.global.clone();
        if let Some(partition) = self
            .environment()
            .and_then(|env| self.document.environment(env))
        {
            view.extend(partition.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        view.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        view
    }

    /// Keys currently visible: global, active environment and override layer.
    pub fn known_keys(&self) -> BTreeSet<String> {
        let mut keys = self.document.keys_for(self.environment());
        keys.extend(self.overrides.keys().cloned());
        keys
    }

    /// Protects one key. The key does not need to exist.
    pub fn set_protected(&mut self, key: impl Into<String>) {
        self.protected.insert(key.into());
    }

    /// Protects every key in `keys`.
    pub fn set_keys_protected<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected.extend(keys.into_iter().map(Into::into));
    }

    /// Protects the keys visible right now. Keys appearing later stay writable.
    pub fn set_all_protected(&mut self) {
        let snapshot = self.known_keys();
        self.protected.extend(snapshot);
    }

    /// Lifts protection from one key.
    pub fn remove_protection(&mut self, key: &str) {
        self.protected.remove(key);
    }

    /// Lifts protection from every key in `keys`.
    pub fn remove_keys_protection<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for key in keys {
            self.protected.remove(key.as_ref());
        }
    }

    /// Clears the protection set.
    pub fn remove_all_protection(&mut self) {
        self.protected.clear();
    }

    /// Returns true when writes to `key` are rejected.
    pub fn is_protected(&self, key: &str) -> bool {
        self.protected.contains(key)
    }

    /// The protection set.
    pub fn protected_keys(&self) -> &BTreeSet<String> {
        &self.protected
    }

    /// Writes `value` into the override layer unless `key` is protected.
    ///
    /// Returns whether the write was applied. Callers above the store do not
    /// surface this to their own callers.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) -> bool {
        let key = key.into();
        if self.is_protected(&key) {
            tracing::debug!(key = %key, "Dropped write to protected key");
            return false;
        }
        self.overrides.insert(key, value);
        true
    }

    /// Applies `set` to every pair; protected keys are skipped individually.
    ///
    /// Returns the number of pairs applied.
    pub fn overwrite_all<I, K>(&mut self, mapping: I) -> usize
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: Into<String>,
    {
        mapping
            .into_iter()
            .map(|(key, value)| self.set(key, value))
            .filter(|applied| *applied)
            .count()
    }

    /// Whether accepted writes should be flushed.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Toggles persistence for future writes only.
    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// The override layer.
    pub fn overrides(&self) -> &Partition {
        &self.overrides
    }

    /// The base document.
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }
}
