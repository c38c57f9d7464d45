//! Settings for opening the store from the environment.
//!
//! Responsibilities:
//! - Resolve storage root, locators, environment, persistence flag and password
//!   from environment variables and builder methods.
//! - Gate `.env` loading behind `DOTENV_DISABLED`.
//! - Open a `Configuration` over `FileStorage` from resolved settings.
//!
//! Does NOT handle:
//! - Store semantics (see `store` and `facade`).
//!
//! Invariants / Assumptions:
//! - Builder methods take precedence over environment variables.
//! - Empty or whitespace-only environment variables are treated as unset.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.

mod builder;
mod env;


pub use builder::{Settings, SettingsLoader};
pub use env::env_var_or_none;
