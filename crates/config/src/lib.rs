//! Layered, environment-aware configuration store.
//!
//! A read-only base document (global values plus per-environment partitions)
//! is combined with a runtime override layer. Keys can be protected against
//! runtime writes, and overrides are optionally persisted, encrypted, to a
//! document owned by the store.
//!
//! Lookup order for a key: override layer, active environment partition,
//! global partition.

mod codec;
pub mod constants;
mod document;
pub mod encryption;
mod error;
mod facade;
mod persistence;
mod settings;
mod storage;
mod store;

pub use codec::{CodecError, DocumentCodec, Format, JsonCodec, TomlCodec, YamlCodec};
pub use document::{ConfigDocument, ConfigValue, Partition};
pub use encryption::{
    AesGcmTransform, CryptoTransform, EncryptionError, PasswordSource, decrypt_document,
    encrypt_document,
};
pub use error::ConfigError;
pub use facade::{Configuration, ConfigurationBuilder};
pub use persistence::{LifecycleState, PersistenceController};
pub use settings::{Settings, SettingsLoader, env_var_or_none};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::ConfigStore;
