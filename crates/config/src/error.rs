//! Error types for the configuration store.
//!
//! Responsibilities:
//! - Define `ConfigError`, the single error surfaced by the facade and settings loader.
//! - Wrap codec, encryption and storage failures with the locator they concern.
//!
//! Does NOT handle:
//! - Protection violations, unknown keys or unknown environments: those are not errors.
//!
//! Invariants:
//! - Error messages never include configuration values or passwords.
//! - Dotenv errors never include raw .env line contents.

use std::io::ErrorKind;

use thiserror::Error;

use crate::codec::CodecError;
use crate::encryption::EncryptionError;
use crate::storage::StorageError;

/// Errors that can occur while loading, flushing or configuring the store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to decode document '{locator}': {source}")]
    Decode {
        locator: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to decrypt document '{locator}': {source}")]
    Decrypt {
        locator: String,
        #[source]
        source: EncryptionError,
    },

    #[error("Failed to encode overrides: {0}")]
    Encode(#[source] CodecError),

    #[error("Failed to encrypt overrides: {0}")]
    Encrypt(#[source] EncryptionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Base document '{locator}' not found")]
    BaseDocumentMissing { locator: String },

    #[error("Overrides cannot be flushed before they are loaded")]
    NotLoaded,

    #[error("A decryption password was set but no crypto transform is configured")]
    PasswordWithoutTransform,

    #[error("Invalid value for {var}: {message}")]
    Settings { var: String, message: String },

    #[error("Unable to determine config directory: {0}")]
    ConfigDirUnavailable(String),

    #[error("Failed to resolve decryption password: {0}")]
    Password(#[source] EncryptionError),

    /// SAFETY: only the byte index of the parse failure is kept, never the line.
    #[error(
        "Failed to parse .env file at position {error_index}. Hint: set DOTENV_DISABLED=1 to skip .env loading"
    )]
    DotenvParse { error_index: usize },

    #[error("Failed to read .env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    #[error("Failed to load .env file. Hint: set DOTENV_DISABLED=1 to skip .env loading")]
    DotenvUnknown,
}

impl ConfigError {
    /// True for failures that prevent the store from being constructed.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ConfigError::Decode { .. }
                | ConfigError::Decrypt { .. }
                | ConfigError::BaseDocumentMissing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_error_names_locator_not_password() {
        let err = ConfigError::Decrypt {
            locator: "overrides.json".to_string(),
            source: EncryptionError::DecryptionFailed,
        };
        let message = err.to_string();
        assert!(message.contains("overrides.json"));
        assert!(message.contains("wrong password"));
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_storage_errors_are_recoverable() {
        let err = ConfigError::from(StorageError::Write {
            path: "overrides.json".into(),
            source: std::io::Error::from(ErrorKind::PermissionDenied),
        });
        assert!(!err.is_load_failure());
        assert!(err.to_string().contains("overrides.json"));
    }
}
