//! Settings loader builder implementation.
//!
//! Responsibilities:
//! - Collect settings from builder methods and environment variables.
//! - Apply defaults (platform config dir, default locators, persistent).
//! - Open a `Configuration` over `FileStorage`.
//!
//! Does NOT handle:
//! - Environment variable parsing (delegated to env.rs).

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use super::env::apply_env;
use crate::constants::{
    APP_NAME, DEFAULT_BASE_FILE, DEFAULT_OVERRIDE_FILE, ENV_DOTENV_DISABLED,
};
use crate::encryption::PasswordSource;
use crate::error::ConfigError;
use crate::facade::Configuration;
use crate::storage::FileStorage;

/// Loader that resolves [`Settings`] from the environment and builder methods.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    pub(crate) config_dir: Option<PathBuf>,
    pub(crate) base_file: Option<String>,
    pub(crate) override_file: Option<String>,
    pub(crate) environment: Option<String>,
    pub(crate) persistent: Option<bool>,
    pub(crate) password: Option<PasswordSource>,
    pub(crate) require_base: bool,
}

impl SettingsLoader {
    /// Create a new settings loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var(ENV_DOTENV_DISABLED).ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// Missing `.env` files are silently ignored.
    ///
    /// # Errors
    /// Returns `ConfigError::DotenvParse` for invalid syntax and
    /// `ConfigError::DotenvIo` when the file cannot be read.
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if Self::is_not_found(&e) => Ok(self),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    /// Check if a dotenv error indicates the file was not found.
    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Fill settings not set through builder methods from environment variables.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_env(&mut self)?;
        Ok(self)
    }

    /// Storage root directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Base document locator, relative to the storage root.
    pub fn with_base_file(mut self, file: impl Into<String>) -> Self {
        self.base_file = Some(file.into());
        self
    }

    /// Override document locator, relative to the storage root.
    pub fn with_override_file(mut self, file: impl Into<String>) -> Self {
        self.override_file = Some(file.into());
        self
    }

    /// Initial environment.
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Initial persistence flag.
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// Literal decryption password.
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(PasswordSource::Literal(SecretString::new(password.into())));
        self
    }

    /// Any password source (env var, keyring).
    pub fn with_password_source(mut self, source: PasswordSource) -> Self {
        self.password = Some(source);
        self
    }

    /// Fail to open when the base document is missing.
    pub fn with_required_base(mut self, required: bool) -> Self {
        self.require_base = required;
        self
    }

    /// Resolve defaults and produce the final settings.
    ///
    /// # Errors
    /// Returns `ConfigError::ConfigDirUnavailable` when no directory was given
    /// and the platform config directory cannot be determined.
    pub fn build(self) -> Result<Settings, ConfigError> {
        let config_dir = match self.config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };

        Ok(Settings {
            config_dir,
            base_file: self
                .base_file
                .unwrap_or_else(|| DEFAULT_BASE_FILE.to_string()),
            override_file: self
                .override_file
                .unwrap_or_else(|| DEFAULT_OVERRIDE_FILE.to_string()),
            environment: self.environment,
            persistent: self.persistent.unwrap_or(true),
            password: self.password,
            require_base: self.require_base,
        })
    }
}

/// Platform config directory:
/// - Linux: `~/.config/stratum`
/// - macOS: `~/Library/Application Support/stratum`
/// - Windows: `%AppData%\stratum\config`
fn default_config_dir() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            ConfigError::ConfigDirUnavailable("no home directory for this user".to_string())
        })
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub base_file: String,
    pub override_file: String,
    pub environment: Option<String>,
    pub persistent: bool,
    pub password: Option<PasswordSource>,
    pub require_base: bool,
}

impl Settings {
    /// Storage rooted at `config_dir`.
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.config_dir)
    }

    /// Opens the configuration described by these settings.
    ///
    /// # Errors
    /// Password resolution failures and every load failure of
    /// [`crate::ConfigurationBuilder::open`].
    pub fn open(&self) -> Result<Configuration, ConfigError> {
        let mut builder = Configuration::builder(Arc::new(self.storage()))
            .with_base_locator(&self.base_file)
            .with_override_locator(&self.override_file)
            .require_base_document(self.require_base)
            .persistent(self.persistent);

        if let Some(env) = &self.environment {
            builder = builder.with_environment(env);
        }
        if let Some(source) = &self.password {
            let password = source.resolve().map_err(ConfigError::Password)?;
            builder = builder.with_decryption_password(password);
        }

        tracing::debug!(
            dir = %self.config_dir.display(),
            base = %self.base_file,
            overrides = %self.override_file,
            "Opening configuration"
        );
        builder.open()
    }
}
