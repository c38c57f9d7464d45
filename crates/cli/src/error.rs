//! CLI exit codes for scripting and automation.
//!
//! Responsibilities:
//! - Define structured exit codes that scripts can use to distinguish error types.
//! - Map configuration errors anywhere in an `anyhow` chain to those codes.
//!
//! Does NOT handle:
//! - Error message formatting (handled by anyhow Display).

use stratum_config::{CodecError, ConfigError, EncryptionError, StorageError};
use thiserror::Error;

/// Structured exit codes for stratum-cli.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success - command completed successfully.
    Success = 0,

    /// General error - unhandled or generic failure.
    GeneralError = 1,

    /// Decryption failure - wrong or missing password.
    ///
    /// Scripts should supply the right password rather than retry.
    DecryptFailed = 2,

    /// Decode failure - a document is not valid for its format.
    DecodeFailed = 3,

    /// Key not found in any layer.
    NotFound = 4,

    /// Storage failure - a document could not be read or written.
    ///
    /// Scripts may retry once the filesystem problem is fixed.
    StorageError = 5,
}

impl ExitCode {
    /// Convert the exit code to an i32 for use with std::process::exit().
    pub const fn as_i32(self) -> i32 {
        self as u8 as i32
    }
}

/// Errors raised by the CLI itself.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("{0} must contain a JSON object")]
    NotAnObject(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("A password is required for this command (use --password or STRATUM_PASSWORD)")]
    PasswordRequired,
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::Decrypt { .. } | ConfigError::Encrypt(_) | ConfigError::Password(_) => {
                ExitCode::DecryptFailed
            }
            ConfigError::Decode { .. } | ConfigError::Encode(_) => ExitCode::DecodeFailed,
            ConfigError::Storage(_) => ExitCode::StorageError,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<&CliError> for ExitCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::KeyNotFound(_) => ExitCode::NotFound,
            CliError::NotAnObject(_) => ExitCode::DecodeFailed,
            CliError::FileNotFound(_) => ExitCode::StorageError,
            CliError::PasswordRequired => ExitCode::DecryptFailed,
        }
    }
}

/// Extension trait for anyhow::Error to extract exit codes.
pub trait ExitCodeExt {
    /// Extract the appropriate exit code from this error.
    ///
    /// Returns ExitCode::GeneralError when no known error is in the chain.
    fn exit_code(&self) -> ExitCode;
}

impl ExitCodeExt for anyhow::Error {
    fn exit_code(&self) -> ExitCode {
        for cause in self.chain() {
            if let Some(err) = cause.downcast_ref::<CliError>() {
                return ExitCode::from(err);
            }
            if let Some(err) = cause.downcast_ref::<ConfigError>() {
                return ExitCode::from(err);
            }
            if cause.downcast_ref::<EncryptionError>().is_some() {
                return ExitCode::DecryptFailed;
            }
            if cause.downcast_ref::<CodecError>().is_some()
                || cause.downcast_ref::<serde_json::Error>().is_some()
            {
                return ExitCode::DecodeFailed;
            }
            if cause.downcast_ref::<StorageError>().is_some() {
                return ExitCode::StorageError;
            }
        }
        ExitCode::GeneralError
    }
}
