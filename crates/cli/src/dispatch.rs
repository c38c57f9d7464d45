//! Command dispatch logic.
//!
//! Responsibilities:
//! - Resolve settings from global options and the environment.
//! - Open the configuration for value commands and apply protection flags.
//! - Route parsed CLI arguments to the command handlers.
//!
//! Does NOT handle:
//! - CLI structure definitions (see `args` module).

use anyhow::{Context, Result};
use secrecy::SecretString;
use stratum_config::{Configuration, Settings};

use crate::args::{Cli, Commands};
use crate::commands::{crypt, values};

/// Resolves the settings password, if one was configured.
fn resolve_password(settings: &Settings) -> Result<Option<SecretString>> {
    settings
        .password
        .as_ref()
        .map(|source| source.resolve())
        .transpose()
        .context("Failed to resolve password")
}

/// Opens the configuration and applies `--protect` / `--protect-all`.
fn open_configuration(cli: &Cli, settings: &Settings) -> Result<Configuration> {
    let config = settings.open().with_context(|| {
        format!(
            "Failed to open configuration in {}",
            settings.config_dir.display()
        )
    })?;

    if !cli.protect.is_empty() {
        config.set_keys_to_protected(cli.protect.iter().cloned());
    }
    if cli.protect_all {
        config.set_all_keys_to_protected();
    }
    Ok(config)
}

/// Dispatch CLI commands to their respective handlers.
pub(crate) fn run_command(cli: Cli) -> Result<()> {
    let settings = cli
        .settings_loader()
        .from_env()
        .and_then(|loader| loader.build())
        .context("Failed to resolve settings")?;

    match &cli.command {
        Commands::Encrypt { input, output } => {
            crypt::run_encrypt(input, output, resolve_password(&settings)?)
        }
        Commands::Decrypt { input, output } => {
            crypt::run_decrypt(input, output, resolve_password(&settings)?)
        }
        Commands::Get { key } => values::run_get(&open_configuration(&cli, &settings)?, key),
        Commands::Set { key, value } => {
            values::run_set(&open_configuration(&cli, &settings)?, key, value)
        }
        Commands::Overwrite { file } => {
            values::run_overwrite(&open_configuration(&cli, &settings)?, file)
        }
        Commands::Show => values::run_show(&open_configuration(&cli, &settings)?),
        Commands::Protected => values::run_protected(&open_configuration(&cli, &settings)?),
    }
}
