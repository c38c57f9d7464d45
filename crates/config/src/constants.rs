//! Centralized constants for the stratum workspace.
//!
//! This module contains default values and wire-format parameters shared by
//! the store, the persistence layer and the CLI.

// =============================================================================
// Storage Defaults
// =============================================================================

/// Default locator of the base configuration document.
pub const DEFAULT_BASE_FILE: &str = "config.json";

/// Default locator of the persisted override document.
pub const DEFAULT_OVERRIDE_FILE: &str = "overrides.json";

/// Application name used for platform config directories and the keyring service.
pub const APP_NAME: &str = "stratum";

/// Extension appended to a locator while its replacement is being written.
pub const TEMP_EXTENSION: &str = "tmp";

// =============================================================================
// Environment Variables
// =============================================================================

/// Storage root directory.
pub const ENV_CONFIG_DIR: &str = "STRATUM_CONFIG_DIR";

/// Base document locator, relative to the storage root.
pub const ENV_BASE_FILE: &str = "STRATUM_BASE_FILE";

/// Override document locator, relative to the storage root.
pub const ENV_OVERRIDE_FILE: &str = "STRATUM_OVERRIDE_FILE";

/// Initial active environment.
pub const ENV_ENVIRONMENT: &str = "STRATUM_ENV";

/// Whether overrides survive restarts.
pub const ENV_PERSISTENT: &str = "STRATUM_PERSISTENT";

/// Literal decryption password.
pub const ENV_PASSWORD: &str = "STRATUM_PASSWORD";

/// Name of another variable that holds the decryption password.
pub const ENV_PASSWORD_ENV: &str = "STRATUM_PASSWORD_ENV";

/// Disables `.env` loading when set to `1` or `true`.
pub const ENV_DOTENV_DISABLED: &str = "DOTENV_DISABLED";

// =============================================================================
// Encryption Envelope
// =============================================================================

/// Magic prefix identifying an encrypted document.
pub const ENVELOPE_MAGIC: &[u8; 8] = b"STRATUM\x01";

/// Argon2id salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Keyring account under which a document password may be stored.
pub const KEYRING_PASSWORD_ACCOUNT: &str = "document-password";
