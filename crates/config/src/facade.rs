//! The public access point.
//!
//! Responsibilities:
//! - Build a `Configuration` from storage, codec, optional encryption and locators.
//! - Expose the store operations behind one lock.
//! - Trigger flushes on accepted writes while persistent, and on `tear_down`.
//!
//! Does NOT handle:
//! - Resolution and protection rules (see `store`).
//! - Byte-level persistence (see `persistence`).
//!
//! Invariants:
//! - One mutex guards the store and the controller together; it is held for a
//!   whole operation, including the flush a write triggers.
//! - Load failures surface from `ConfigurationBuilder::open`; a `Configuration`
//!   never exists half loaded.
//! - Protection rejections are never reported to callers.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;

use crate::codec::{DocumentCodec, Format};
use crate::constants::{DEFAULT_BASE_FILE, DEFAULT_OVERRIDE_FILE};
use crate::document::{ConfigDocument, ConfigValue, Partition};
use crate::encryption::{AesGcmTransform, CryptoTransform};
use crate::error::ConfigError;
use crate::persistence::{LifecycleState, PersistenceController, read_document};
use crate::storage::Storage;
use crate::store::ConfigStore;

struct Inner {
    store: ConfigStore,
    persistence: PersistenceController,
}

impl Inner {
    /// Flushes after an accepted write when the store is persistent.
    fn after_write(&mut self, applied: bool) -> Result<(), ConfigError> {
        if !applied || !self.store.is_persistent() {
            return Ok(());
        }
        if self.persistence.state() == LifecycleState::Terminated {
            tracing::debug!("Write after tear down, flushing anyway");
        }
        self.persistence.flush(self.store.overrides()).map(|_| ())
    }
}

/// Layered, environment-aware configuration with protected keys and persisted overrides.
///
/// Construct one per process with [`ConfigurationBuilder`] and share it as
/// `Arc<Configuration>`; call [`Configuration::tear_down`] at shutdown.
pub struct Configuration {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Configuration")
            .field("environment", &inner.store.environment())
            .field("protected", &inner.store.protected_keys().len())
            .field("overrides", &inner.store.overrides().len())
            .field("persistence", &inner.persistence)
            .finish()
    }
}

impl Configuration {
    /// Starts building a configuration over `storage`.
    pub fn builder(storage: Arc<dyn Storage>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(storage)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Selects the active environment, e.g. `"PRODUCTION"`.
    pub fn set_env(&self, env: impl Into<String>) {
        self.lock().store.set_env(env);
    }

    /// The active environment, if any.
    pub fn env(&self) -> Option<String> {
        self.lock().store.environment().map(str::to_string)
    }

    /// Replaces the password used to encrypt subsequent flushes.
    ///
    /// Encrypted documents are opened at construction, so the password needed
    /// to read them must be given to [`ConfigurationBuilder::with_decryption_password`].
    pub fn set_decryption_password(&self, password: SecretString) {
        self.lock().persistence.set_password(password);
    }

    /// Returns the value for `key`: override, then active environment, then global.
    pub fn config_value_for_key(&self, key: &str) -> Option<ConfigValue> {
        self.lock().store.get(key).cloned()
    }

    /// The merged view for the active environment.
    pub fn resolved(&self) -> Partition {
        self.lock().store.resolved()
    }

    /// Flushes the override layer if overrides are currently persistent.
    ///
    /// Call at application shutdown. Calling it again re-flushes.
    pub fn tear_down(&self) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        let Inner { store, persistence } = &mut *inner;
        persistence.tear_down(store.overrides(), store.is_persistent())
    }

    /// Protects `key` from overwrites. The key does not have to exist yet.
    pub fn set_key_to_protected(&self, key: impl Into<String>) {
        self.lock().store.set_protected(key);
    }

    /// Protects every key in `keys`.
    pub fn set_keys_to_protected<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().store.set_keys_protected(keys);
    }

    /// Protects every key visible right now.
    pub fn set_all_keys_to_protected(&self) {
        self.lock().store.set_all_protected();
    }

    /// Lifts protection from `key`.
    pub fn remove_key_protection(&self, key: &str) {
        self.lock().store.remove_protection(key);
    }

    /// Lifts protection from every key in `keys`.
    pub fn remove_keys_from_protection<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lock().store.remove_keys_protection(keys);
    }

    /// Clears the protection set.
    pub fn remove_all_key_protection(&self) {
        self.lock().store.remove_all_protection();
    }

    /// The protection set.
    pub fn protected_keys(&self) -> BTreeSet<String> {
        self.lock().store.protected_keys().clone()
    }

    /// Whether overwrites survive restarts. Affects future writes only.
    pub fn set_overwrite_state_to_persistent(&self, persistent: bool) {
        self.lock().store.set_persistent(persistent);
    }

    /// Overrides `key` with `value` unless the key is protected.
    ///
    /// # Errors
    /// Only the flush triggered by an accepted persistent write can fail; the
    /// value stays visible in memory either way.
    pub fn set_object(&self, value: ConfigValue, key: impl Into<String>) -> Result<(), ConfigError> {
        let mut inner = self.lock();
        let applied = inner.store.set(key, value);
        inner.after_write(applied)
    }

    /// Overrides every unprotected key of `mapping`; protected keys are skipped.
    ///
    /// # Errors
    /// Same as [`Configuration::set_object`]; at most one flush runs per call.
    pub fn overwrite_config_with_dictionary<I, K>(&self, mapping: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: Into<String>,
    {
        let mut inner = self.lock();
        let applied = inner.store.overwrite_all(mapping);
        inner.after_write(applied > 0)
    }

    /// The lifecycle state of the persistence controller.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lock().persistence.state()
    }
}

/// Builder for [`Configuration`].
pub struct ConfigurationBuilder {
    storage: Arc<dyn Storage>,
    codec: Option<Box<dyn DocumentCodec>>,
    crypto: Option<Arc<dyn CryptoTransform>>,
    password: Option<SecretString>,
    base_locator: String,
    override_locator: String,
    base_document: Option<ConfigDocument>,
    require_base: bool,
    environment: Option<String>,
    persistent: bool,
}

impl ConfigurationBuilder {
    /// Creates a builder with default locators, JSON documents and AES-GCM encryption.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            codec: None,
            crypto: Some(Arc::new(AesGcmTransform)),
            password: None,
            base_locator: DEFAULT_BASE_FILE.to_string(),
            override_locator: DEFAULT_OVERRIDE_FILE.to_string(),
            base_document: None,
            require_base: false,
            environment: None,
            persistent: true,
        }
    }

    /// Locator of the base document. Also selects the codec when none was set.
    pub fn with_base_locator(mut self, locator: impl Into<String>) -> Self {
        self.base_locator = locator.into();
        self
    }

    /// Locator of the persisted overrides.
    pub fn with_override_locator(mut self, locator: impl Into<String>) -> Self {
        self.override_locator = locator.into();
        self
    }

    /// Uses `document` as the base instead of reading it from storage.
    pub fn with_base_document(mut self, document: ConfigDocument) -> Self {
        self.base_document = Some(document);
        self
    }

    /// Fails `open` when the base document is missing from storage.
    pub fn require_base_document(mut self, required: bool) -> Self {
        self.require_base = required;
        self
    }

    /// Overrides the codec used for both documents.
    pub fn with_codec(mut self, codec: Box<dyn DocumentCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replaces the crypto transform.
    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoTransform>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Disables encryption support entirely.
    pub fn without_crypto(mut self) -> Self {
        self.crypto = None;
        self
    }

    /// Password for encrypted documents; new flushes are encrypted with it.
    pub fn with_decryption_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Initial environment.
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Initial persistence flag (defaults to `true`).
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Loads the base document and persisted overrides.
    ///
    /// # Errors
    /// Returns a decode or decrypt error when either document cannot be
    /// opened, `ConfigError::BaseDocumentMissing` when required and absent,
    /// `ConfigError::PasswordWithoutTransform` when a password is set after
    /// `without_crypto`,
    /// and storage errors as they occur.
    pub fn open(self) -> Result<Configuration, ConfigError> {
        if self.password.is_some() && self.crypto.is_none() {
            tracing::warn!(
                locator = %self.override_locator,
                "Decryption password given without a crypto transform"
            );
            return Err(ConfigError::PasswordWithoutTransform);
        }

        let codec = self
            .codec
            .unwrap_or_else(|| Format::from_locator(&self.base_locator).codec());

        let document = match self.base_document {
            Some(document) => document,
            None => match read_document(
                self.storage.as_ref(),
                codec.as_ref(),
                self.crypto.as_deref(),
                self.password.as_ref(),
                &self.base_locator,
            )? {
                Some((document, _, encrypted)) => {
                    tracing::debug!(
                        locator = %self.base_locator,
                        format = codec.name(),
                        encrypted,
                        "Loaded base document"
                    );
                    document
                }
                None if self.require_base => {
                    return Err(ConfigError::BaseDocumentMissing {
                        locator: self.base_locator,
                    });
                }
                None => {
                    tracing::debug!(locator = %self.base_locator, "No base document, starting empty");
                    ConfigDocument::new()
                }
            },
        };

        let mut persistence = PersistenceController::new(
            self.storage,
            codec,
            self.crypto,
            self.password,
            self.override_locator,
        );
        let overrides = persistence.load()?;

        let mut store = ConfigStore::with_overrides(document, overrides);
        store.set_persistent(self.persistent);
        if let Some(env) = self.environment {
            store.set_env(env);
        }

        Ok(Configuration {
            inner: Mutex::new(Inner { store, persistence }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.insert(
            DEFAULT_BASE_FILE,
            br#"{
                "global": {"theme": "light", "timeout": 30},
                "environments": {"PROD": {"endpoint": "prod.example"}}
            }"#
            .to_vec(),
        );
        storage
    }

    fn open(storage: &MemoryStorage) -> Configuration {
        Configuration::builder(Arc::new(storage.clone()))
            .open()
            .unwrap()
    }

    #[test]
    fn test_accepted_write_flushes_immediately() {
        let storage = seeded();
        let config = open(&storage);

        config.set_object(json!("dark"), "theme").unwrap();

        assert!(storage.contains(DEFAULT_OVERRIDE_FILE));
        assert_eq!(open(&storage).config_value_for_key("theme"), Some(json!("dark")));
    }

    #[test]
    fn test_protected_write_does_not_flush() {
        let storage = seeded();
        let config = open(&storage);
        config.set_key_to_protected("theme");

        config.set_object(json!("dark"), "theme").unwrap();

        assert!(!storage.contains(DEFAULT_OVERRIDE_FILE));
        assert_eq!(config.config_value_for_key("theme"), Some(json!("light")));
    }

    #[test]
    fn test_non_persistent_write_stays_in_memory() {
        let storage = seeded();
        let config = open(&storage);
        config.set_overwrite_state_to_persistent(false);

        config.set_object(json!(5), "timeout").unwrap();
        config.tear_down().unwrap();

        assert_eq!(config.config_value_for_key("timeout"), Some(json!(5)));
        assert_eq!(open(&storage).config_value_for_key("timeout"), Some(json!(30)));
    }

    #[test]
    fn test_tear_down_moves_to_terminated() {
        let storage = seeded();
        let config = open(&storage);
        assert_eq!(config.lifecycle(), LifecycleState::Loaded);

        config.tear_down().unwrap();
        assert_eq!(config.lifecycle(), LifecycleState::Terminated);
        config.tear_down().unwrap();
        assert_eq!(config.lifecycle(), LifecycleState::Terminated);
    }

    #[test]
    fn test_required_base_document() {
        let storage = MemoryStorage::new();
        let err = Configuration::builder(Arc::new(storage.clone()))
            .require_base_document(true)
            .open()
            .unwrap_err();
        assert!(matches!(err, ConfigError::BaseDocumentMissing { .. }));

        let config = Configuration::builder(Arc::new(storage))
            .open()
            .unwrap();
        assert!(config.resolved().is_empty());
    }

    #[test]
    fn test_builder_environment_and_inline_document() {
        let config = Configuration::builder(Arc::new(MemoryStorage::new()))
            .with_base_document(
                ConfigDocument::new().with_env_value("QA", "endpoint", json!("qa.example")),
            )
            .with_environment("QA")
            .open()
            .unwrap();

        assert_eq!(config.env().as_deref(), Some("QA"));
        assert_eq!(
            config.config_value_for_key("endpoint"),
            Some(json!("qa.example"))
        );
    }

    #[test]
    fn test_password_without_transform_is_rejected() {
        let storage = seeded();
        let err = Configuration::builder(Arc::new(storage.clone()))
            .without_crypto()
            .with_decryption_password(SecretString::new("pw".into()))
            .open()
            .unwrap_err();

        assert!(matches!(err, ConfigError::PasswordWithoutTransform));
        assert!(!storage.contains(DEFAULT_OVERRIDE_FILE));
    }

    #[test]
    fn test_configuration_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Configuration>();

        let storage = seeded();
        let config = Arc::new(open(&storage));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let config = Arc::clone(&config);
                std::thread::spawn(move || {
                    config
                        .set_object(json!(i), format!("worker_{i}"))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = open(&storage);
        for i in 0..4 {
            assert_eq!(
                reloaded.config_value_for_key(&format!("worker_{i}")),
                Some(json!(i))
            );
        }
    }
}
