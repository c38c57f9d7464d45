//! Encrypt and decrypt document files.
//!
//! Responsibilities:
//! - Seal a plaintext document into the encrypted envelope, or open one.
//! - Check that the plaintext side decodes as a document for its extension.
//!
//! Invariants:
//! - Output files are written through `FileStorage` (temp file + rename).

use std::path::Path;

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use stratum_config::{
    AesGcmTransform, CryptoTransform, FileStorage, Format, Storage, decrypt_document,
    encrypt_document,
};

use crate::error::CliError;

/// Storage rooted at the file's directory, plus the file name as locator.
fn storage_for(path: &Path) -> Result<(FileStorage, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file path: {}", path.display()))?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Ok((FileStorage::new(parent), name.to_string()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let (storage, locator) = storage_for(path)?;
    storage
        .read(&locator)?
        .ok_or_else(|| CliError::FileNotFound(path.display().to_string()).into())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let (storage, locator) = storage_for(path)?;
    storage.write(&locator, bytes)?;
    Ok(())
}

fn check_decodes(path: &Path, plaintext: &[u8]) -> Result<()> {
    Format::from_locator(&path.to_string_lossy())
        .codec()
        .decode(plaintext)
        .with_context(|| format!("{} is not a valid document", path.display()))?;
    Ok(())
}

pub fn run_encrypt(input: &Path, output: &Path, password: Option<SecretString>) -> Result<()> {
    let password = password.ok_or(CliError::PasswordRequired)?;
    let plaintext = read_file(input)?;
    if AesGcmTransform.is_encrypted(&plaintext) {
        bail!("{} is already encrypted", input.display());
    }
    check_decodes(input, &plaintext)?;

    let sealed = encrypt_document(&plaintext, &password)
        .with_context(|| format!("Failed to encrypt {}", input.display()))?;
    write_file(output, &sealed)?;

    tracing::info!(input = %input.display(), output = %output.display(), "Document encrypted");
    Ok(())
}

pub fn run_decrypt(input: &Path, output: &Path, password: Option<SecretString>) -> Result<()> {
    let password = password.ok_or(CliError::PasswordRequired)?;
    let sealed = read_file(input)?;

    let plaintext = decrypt_document(&sealed, &password)
        .with_context(|| format!("Failed to decrypt {}", input.display()))?;
    check_decodes(output, &plaintext)?;
    write_file(output, &plaintext)?;

    tracing::info!(input = %input.display(), output = %output.display(), "Document decrypted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn password() -> Option<SecretString> {
        Some(SecretString::new("pw".into()))
    }

    #[test]
    fn test_encrypt_then_decrypt_restores_bytes() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("config.json");
        let sealed = dir.path().join("config.json.enc");
        let restored = dir.path().join("restored.json");
        std::fs::write(&plain, br#"{"global":{"theme":"light"}}"#).unwrap();

        run_encrypt(&plain, &sealed, password()).unwrap();
        assert_ne!(std::fs::read(&sealed).unwrap(), std::fs::read(&plain).unwrap());

        run_decrypt(&sealed, &restored, password()).unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), std::fs::read(&plain).unwrap());
    }

    #[test]
    fn test_encrypt_requires_password() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("config.json");
        std::fs::write(&plain, b"{}").unwrap();

        let err = run_encrypt(&plain, &dir.path().join("out"), None).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::PasswordRequired)));
    }

    #[test]
    fn test_encrypt_rejects_invalid_document() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("config.json");
        std::fs::write(&plain, b"not json").unwrap();

        assert!(run_encrypt(&plain, &dir.path().join("out"), password()).is_err());
        assert!(!dir.path().join("out").exists());
    }
}
