//! Durable storage of the override layer.
//!
//! Responsibilities:
//! - Read documents through storage, the optional crypto transform and the codec.
//! - Reconstruct the override layer at startup.
//! - Flush the override layer, skipping writes when nothing changed.
//! - Track the controller lifecycle (`Uninitialized -> Loaded -> Terminated`).
//!
//! Does NOT handle:
//! - Deciding whether a write is allowed (see `store`).
//! - Deciding whether a write should be flushed (see `facade`).
//!
//! Invariants:
//! - Decode and decrypt failures at load are fatal; nothing is partially loaded.
//! - Overrides live in the persisted document's global partition.
//! - A flush whose encoded plaintext equals the last persisted plaintext
//!   does not touch storage, so repeated flushes leave identical bytes.
//! - A failed flush leaves the in-memory layer and the stored bytes untouched.

use std::sync::Arc;

use secrecy::SecretString;

use crate::codec::DocumentCodec;
use crate::document::{ConfigDocument, Partition};
use crate::encryption::{CryptoTransform, EncryptionError};
use crate::error::ConfigError;
use crate::storage::Storage;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Loaded,
    Terminated,
}

/// Shared read pipeline: storage, then decrypt (when enveloped), then decode.
///
/// Returns the document and whether it was stored encrypted, or `None`
/// when nothing is stored at `locator`.
pub(crate) fn read_document(
    storage: &dyn Storage,
    codec: &dyn DocumentCodec,
    crypto: Option<&dyn CryptoTransform>,
    password: Option<&SecretString>,
    locator: &str,
) -> Result<Option<(ConfigDocument, Vec<u8>, bool)>, ConfigError> {
    let Some(bytes) = storage.read(locator)? else {
        return Ok(None);
    };

    let (plaintext, encrypted) = match crypto {
        Some(crypto) if crypto.is_encrypted(&bytes) => {
            let password = password.ok_or_else(|| ConfigError::Decrypt {
                locator: locator.to_string(),
                source: EncryptionError::PasswordRequired,
            })?;
            let plaintext =
                crypto
                    .decrypt(&bytes, password)
                    .map_err(|source| ConfigError::Decrypt {
                        locator: locator.to_string(),
                        source,
                    })?;
            (plaintext, true)
        }
        _ => (bytes, false),
    };

    let document = codec
        .decode(&plaintext)
        .map_err(|source| ConfigError::Decode {
            locator: locator.to_string(),
            source,
        })?;

    Ok(Some((document, plaintext, encrypted)))
}

/// Loads and flushes the override layer.
pub struct PersistenceController {
    storage: Arc<dyn Storage>,
    codec: Box<dyn DocumentCodec>,
    crypto: Option<Arc<dyn CryptoTransform>>,
    password: Option<SecretString>,
    locator: String,
    state: LifecycleState,
    last_flushed: Option<Vec<u8>>,
}

impl std::fmt::Debug for PersistenceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceController")
            .field("codec", &self.codec.name())
            .field("encrypted", &self.encrypts())
            .field("locator", &self.locator)
            .field("state", &self.state)
            .finish()
    }
}

impl PersistenceController {
    /// Creates an uninitialized controller for the document at `locator`.
    pub fn new(
        storage: Arc<dyn Storage>,
        codec: Box<dyn DocumentCodec>,
        crypto: Option<Arc<dyn CryptoTransform>>,
        password: Option<SecretString>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            codec,
            crypto,
            password,
            locator: locator.into(),
            state: LifecycleState::Uninitialized,
            last_flushed: None,
        }
    }

    /// The lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Locator of the override document.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// True when flushes are encrypted.
    pub fn encrypts(&self) -> bool {
        self.crypto.is_some() && self.password.is_some()
    }

    /// Replaces the password used for subsequent flushes.
    ///
    /// The next flush always rewrites the document under the new password.
    pub fn set_password(&mut self, password: SecretString) {
        self.password = Some(password);
        self.last_flushed = None;
    }

    /// Reconstructs the override layer from storage.
    ///
    /// # Errors
    /// Returns `ConfigError::Decrypt` or `ConfigError::Decode` when a persisted
    /// document exists but cannot be opened, and `ConfigError::Storage` when it
    /// cannot be read.
    pub fn load(&mut self) -> Result<Partition, ConfigError> {
        let loaded = read_document(
            self.storage.as_ref(),
            self.codec.as_ref(),
            self.crypto.as_deref(),
            self.password.as_ref(),
            &self.locator,
        )?;

        let overrides = match loaded {
            Some((document, plaintext, encrypted)) => {
                if !document.environments.is_empty() {
                    tracing::warn!(
                        locator = %self.locator,
                        environments = document.environments.len(),
                        "Persisted overrides contain environment partitions, ignoring them"
                    );
                }
                if self.encrypts() && !encrypted {
                    tracing::warn!(
                        locator = %self.locator,
                        "Persisted overrides are not encrypted, they will be encrypted on next flush"
                    );
                } else {
                    self.last_flushed = Some(plaintext);
                }
                tracing::debug!(
                    locator = %self.locator,
                    keys = document.global.len(),
                    encrypted,
                    "Loaded persisted overrides"
                );
                document.global
            }
            None => {
                tracing::debug!(locator = %self.locator, "No persisted overrides");
                Partition::new()
            }
        };

        self.state = LifecycleState::Loaded;
        Ok(overrides)
    }

    /// Writes `overrides` to storage unless identical bytes are already persisted.
    ///
    /// Returns whether storage was written.
    pub fn flush(&mut self, overrides: &Partition) -> Result<bool, ConfigError> {
        if self.state == LifecycleState::Uninitialized {
            return Err(ConfigError::NotLoaded);
        }

        let document = ConfigDocument::from_global(overrides.clone());
        let plaintext = self.codec.encode(&document).map_err(ConfigError::Encode)?;

        if self.last_flushed.as_deref() == Some(plaintext.as_slice()) {
            tracing::debug!(locator = %self.locator, "Overrides unchanged, skipping flush");
            return Ok(false);
        }

        let bytes = match (&self.crypto, &self.password) {
            (Some(crypto), Some(password)) => crypto
                .encrypt(&plaintext, password)
                .map_err(ConfigError::Encrypt)?,
            _ => plaintext.clone(),
        };

        self.storage.write(&self.locator, &bytes)?;
        self.last_flushed = Some(plaintext);

        tracing::debug!(
            locator = %self.locator,
            keys = overrides.len(),
            encryption = %self.encrypts(),
            "Overrides flushed"
        );
        Ok(true)
    }

    /// Final flush at the lifecycle boundary, honoring the current persistence flag.
    ///
    /// A second call is a harmless re-flush.
    pub fn tear_down(&mut self, overrides: &Partition, persistent: bool) -> Result<(), ConfigError> {
        if persistent {
            self.flush(overrides)?;
        } else {
            tracing::debug!(locator = %self.locator, "Non-persistent tear down, nothing flushed");
        }
        self.state = LifecycleState::Terminated;
        Ok(())
    }
}
