//! Value commands: get, set, overwrite, show, protected.
//!
//! Responsibilities:
//! - Read and write keys through an opened `Configuration`.
//! - Render results as JSON on stdout.
//!
//! Invariants:
//! - Every writing command ends with `tear_down` so persistent overrides reach storage.
//! - Writes to protected keys are not errors; `set` only reports them on stderr.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use stratum_config::{ConfigValue, Configuration};

use crate::error::CliError;

/// Parses a command line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> ConfigValue {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn run_get(config: &Configuration, key: &str) -> Result<()> {
    let value = config
        .config_value_for_key(key)
        .ok_or_else(|| CliError::KeyNotFound(key.to_string()))?;
    print_json(&value)
}

pub fn run_set(config: &Configuration, key: &str, raw: &str) -> Result<()> {
    let value = parse_value(raw);
    config
        .set_object(value.clone(), key)
        .with_context(|| format!("Failed to persist '{key}'"))?;

    if config.config_value_for_key(key).as_ref() != Some(&value) {
        eprintln!("'{key}' is protected, value unchanged");
    }

    config.tear_down().context("Failed to flush overrides")
}

pub fn run_overwrite(config: &Configuration, file: &Path) -> Result<()> {
    let file_display = file.display().to_string();
    let contents = std::fs::read_to_string(file)
        .map_err(|_| CliError::FileNotFound(file_display.clone()))?;
    let parsed: Value =
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {file_display}"))?;
    let Value::Object(mapping) = parsed else {
        return Err(CliError::NotAnObject(file_display).into());
    };

    tracing::info!(keys = mapping.len(), file = %file_display, "Applying overwrite");
    config
        .overwrite_config_with_dictionary(mapping)
        .context("Failed to persist overrides")?;
    config.tear_down().context("Failed to flush overrides")
}

pub fn run_show(config: &Configuration) -> Result<()> {
    print_json(&config.resolved())
}

pub fn run_protected(config: &Configuration) -> Result<()> {
    print_json(&config.protected_keys())
}
