//! Durable storage for documents.
//!
//! Responsibilities:
//! - Define the `Storage` seam (`read` / `write` by locator).
//! - Provide `FileStorage`, rooted at a directory, with atomic replacement.
//! - Provide `MemoryStorage` for embedders and tests.
//!
//! Does NOT handle:
//! - Encoding or encryption (see `codec`, `encryption`).
//! - Deciding when to write (see `persistence`).
//!
//! Invariants:
//! - A missing document is `Ok(None)`, never an error.
//! - `FileStorage` writes go to a sibling temp file and are renamed into place,
//!   so a failed write leaves the previous bytes untouched.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::constants::TEMP_EXTENSION;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Locator '{locator}' must be a relative path inside the storage root")]
    InvalidLocator { locator: String },

    #[error("Failed to replace {path} with its temporary file: {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Byte storage addressed by locator.
pub trait Storage: Send + Sync {
    /// Reads the bytes at `locator`, or `None` when nothing is stored there.
    fn read(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the bytes at `locator`.
    fn write(&self, locator: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Files under a root directory; locators are relative paths.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Creates storage rooted at `root`. The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a locator to its on-disk path.
    ///
    /// Only plain relative components are accepted, so a locator never
    /// resolves outside the root.
    pub fn path_for(&self, locator: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(locator);
        let contained = !locator.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(StorageError::InvalidLocator {
                locator: locator.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for FileStorage {
    fn read(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(locator)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    /// Atomically replaces the file at `locator`.
    ///
    /// Writes to a temporary file first, then renames it to the target path.
    fn write(&self, locator: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(locator)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = temp_path_for(&path);
        std::fs::write(&temp_path, bytes).map_err(|source| StorageError::Write {
            path: temp_path.clone(),
            source,
        })?;

        if let Err(source) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StorageError::Rename { path, source });
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Document replaced atomically");
        Ok(())
    }
}

/// `config.json` -> `config.json.tmp`, keeping the original extension visible.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(TEMP_EXTENSION);
    PathBuf::from(name)
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `locator` with `bytes`.
    pub fn insert(&self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.into(), bytes.into());
    }

    /// Returns a copy of the bytes stored at `locator`.
    pub fn get(&self, locator: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .cloned()
    }

    /// Returns true when something is stored at `locator`.
    pub fn contains(&self, locator: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(locator)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.get(locator))
    }

    fn write(&self, locator: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.insert(locator, bytes);
        Ok(())
    }
}
