//! Environment variable parsing for store settings.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed.
//! - Invalid boolean values return `ConfigError::Settings`.

use std::path::PathBuf;

use secrecy::SecretString;

use super::builder::SettingsLoader;
use crate::constants::{
    ENV_BASE_FILE, ENV_CONFIG_DIR, ENV_ENVIRONMENT, ENV_OVERRIDE_FILE, ENV_PASSWORD,
    ENV_PASSWORD_ENV, ENV_PERSISTENT,
};
use crate::encryption::PasswordSource;
use crate::error::ConfigError;

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parses the boolean spellings accepted for flags.
pub(crate) fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Settings {
            var: var.to_string(),
            message: "must be true or false".to_string(),
        }),
    }
}

/// Fill unset loader fields from environment variables.
///
/// Values already set through builder methods are kept.
pub(crate) fn apply_env(loader: &mut SettingsLoader) -> Result<(), ConfigError> {
    if loader.config_dir.is_none()
        && let Some(dir) = env_var_or_none(ENV_CONFIG_DIR)
    {
        loader.config_dir = Some(PathBuf::from(dir));
    }
    if loader.base_file.is_none() {
        loader.base_file = env_var_or_none(ENV_BASE_FILE);
    }
    if loader.override_file.is_none() {
        loader.override_file = env_var_or_none(ENV_OVERRIDE_FILE);
    }
    if loader.environment.is_none() {
        loader.environment = env_var_or_none(ENV_ENVIRONMENT);
    }
    if loader.persistent.is_none()
        && let Some(value) = env_var_or_none(ENV_PERSISTENT)
    {
        loader.persistent = Some(parse_flag(ENV_PERSISTENT, &value)?);
    }
    if loader.password.is_none() {
        if let Some(password) = env_var_or_none(ENV_PASSWORD) {
            loader.password = Some(PasswordSource::Literal(SecretString::new(password.into())));
        } else if let Some(var) = env_var_or_none(ENV_PASSWORD_ENV) {
            loader.password = Some(PasswordSource::Env(var));
        }
    }
    Ok(())
}
