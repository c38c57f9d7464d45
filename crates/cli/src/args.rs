//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Translate global options into a `SettingsLoader`.
//!
//! Non-responsibilities:
//! - Does not execute commands (see `dispatch` module).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stratum_config::SettingsLoader;

#[derive(Parser)]
#[command(name = "stratum-cli")]
#[command(about = "Inspect and override layered, environment-aware configuration", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  stratum-cli --env PROD get endpoint\n  stratum-cli set theme '\"dark\"'\n  stratum-cli --protect theme overwrite changes.json\n  stratum-cli --password \"$SECRET\" encrypt config.json config.json.enc\n"
)]
pub struct Cli {
    /// Directory holding the base and override documents
    #[arg(long, global = true, env = "STRATUM_CONFIG_DIR", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Active environment, e.g. PROD
    #[arg(short, long, global = true, env = "STRATUM_ENV")]
    pub env: Option<String>,

    /// Base document file name, relative to --dir
    #[arg(long, global = true, env = "STRATUM_BASE_FILE", value_name = "FILE")]
    pub base_file: Option<String>,

    /// Override document file name, relative to --dir
    #[arg(long, global = true, env = "STRATUM_OVERRIDE_FILE", value_name = "FILE")]
    pub override_file: Option<String>,

    /// Password used to decrypt and encrypt documents
    #[arg(short, long, global = true, env = "STRATUM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Keep writes in memory only for this invocation
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Protect a key before running the command (repeatable)
    #[arg(long = "protect", global = true, value_name = "KEY")]
    pub protect: Vec<String>,

    /// Protect every key visible before running the command
    #[arg(long, global = true)]
    pub protect_all: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved value of a key as JSON
    Get {
        /// Key to look up
        key: String,
    },

    /// Override one key and persist it
    Set {
        /// Key to override
        key: String,

        /// New value as JSON; anything that is not valid JSON is stored as a string
        value: String,
    },

    /// Override every key of a JSON object file
    Overwrite {
        /// JSON file holding an object of key/value pairs
        file: PathBuf,
    },

    /// Print the merged view for the active environment
    Show,

    /// Print the protection set after applying --protect flags
    Protected,

    /// Encrypt a document file with --password
    Encrypt {
        /// Plaintext document
        input: PathBuf,

        /// Destination of the encrypted document
        output: PathBuf,
    },

    /// Decrypt a document file with --password
    Decrypt {
        /// Encrypted document
        input: PathBuf,

        /// Destination of the plaintext document
        output: PathBuf,
    },
}

impl Cli {
    /// Builds a settings loader from the global options.
    ///
    /// Options not given here are filled from the environment by
    /// `SettingsLoader::from_env`.
    pub fn settings_loader(&self) -> SettingsLoader {
        let mut loader = SettingsLoader::new();
        if let Some(dir) = &self.dir {
            loader = loader.with_config_dir(dir.clone());
        }
        if let Some(env) = &self.env {
            loader = loader.with_environment(env.clone());
        }
        if let Some(file) = &self.base_file {
            loader = loader.with_base_file(file.clone());
        }
        if let Some(file) = &self.override_file {
            loader = loader.with_override_file(file.clone());
        }
        if let Some(password) = &self.password {
            loader = loader.with_password(password.clone());
        }
        if self.no_persist {
            loader = loader.with_persistent(false);
        }
        loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_protect_is_repeatable() {
        let cli = Cli::try_parse_from([
            "stratum-cli",
            "--protect",
            "theme",
            "--protect",
            "timeout",
            "show",
        ])
        .unwrap();
        assert_eq!(cli.protect, vec!["theme", "timeout"]);
        assert!(matches!(cli.command, Commands::Show));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["stratum-cli", "get", "endpoint", "--env", "PROD"]).unwrap();
        assert_eq!(cli.env.as_deref(), Some("PROD"));
        assert!(matches!(cli.command, Commands::Get { ref key } if key == "endpoint"));
    }
}
