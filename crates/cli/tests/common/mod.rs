//! Shared test utilities for stratum-cli integration tests.
//!
//! Invariants / Assumptions:
//! - All integration tests using these helpers are hermetic: no `.env`
//!   loading and no `STRATUM_*` variables leaking in from the host.

use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// Returns a hermetic `stratum-cli` command rooted at `dir`.
pub fn stratum_cmd(dir: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stratum-cli");

    // Hermeticity: prevent loading local .env
    cmd.env("DOTENV_DISABLED", "1");

    cmd.env_remove("STRATUM_ENV")
        .env_remove("STRATUM_BASE_FILE")
        .env_remove("STRATUM_OVERRIDE_FILE")
        .env_remove("STRATUM_PERSISTENT")
        .env_remove("STRATUM_PASSWORD")
        .env_remove("STRATUM_PASSWORD_ENV");

    cmd.env("STRATUM_CONFIG_DIR", dir);
    cmd
}

/// A temp directory holding a base document with global and PROD values.
pub fn seeded_dir() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let base = serde_json::json!({
        "global": { "theme": "light", "timeout": 30 },
        "environments": {
            "PROD": { "endpoint": "prod.example" }
        }
    });
    std::fs::write(
        dir.path().join("config.json"),
        serde_json::to_vec_pretty(&base).expect("serialize base"),
    )
    .expect("write base");
    dir
}
