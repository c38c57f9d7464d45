//! Encryption utilities for documents at rest.
//!
//! Responsibilities:
//! - Provide AES-256-GCM encryption and decryption.
//! - Handle key derivation using Argon2id.
//! - Frame ciphertext in a self-describing envelope (magic, salt, nonce).
//! - Resolve the document password from its source (literal, env var, keyring).
//!
//! Does NOT handle:
//! - Deciding when documents are written (see `persistence`).
//! - Parsing documents (see `codec`).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use rand::RngExt;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::constants::{
    APP_NAME, ENVELOPE_MAGIC, KEY_LEN, KEYRING_PASSWORD_ACCOUNT, NONCE_LEN, SALT_LEN,
};

/// Errors that can occur during encryption operations.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong password or tampered document")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Document is encrypted but no decryption password was set")]
    PasswordRequired,

    #[error("Encrypted document is truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Document is not an encrypted envelope")]
    NotEncrypted,

    #[error("Keyring error: {0}")]
    KeyringError(#[from] keyring::Error),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

pub type Result<T> = std::result::Result<T, EncryptionError>;

/// Sources for the document password.
#[derive(Debug, Clone)]
pub enum PasswordSource {
    /// A password supplied directly by the caller.
    Literal(SecretString),
    /// A password read from the named environment variable.
    Env(String),
    /// A password stored in the OS keyring under the `stratum` service.
    Keyring,
}

impl PasswordSource {
    /// Resolves the source into the password itself.
    pub fn resolve(&self) -> Result<SecretString> {
        match self {
            Self::Literal(pw) => Ok(pw.clone()),
            Self::Env(var_name) => {
                let val = std::env::var(var_name).map_err(|_| {
                    EncryptionError::EnvError(format!("Environment variable {} not set", var_name))
                })?;
                Ok(SecretString::new(val.into()))
            }
            Self::Keyring => {
                let entry = keyring::Entry::new(APP_NAME, KEYRING_PASSWORD_ACCOUNT)?;
                Ok(SecretString::new(entry.get_password()?.into()))
            }
        }
    }

    /// Stores `password` in the OS keyring so `PasswordSource::Keyring` can find it.
    pub fn store_in_keyring(password: &SecretString) -> Result<()> {
        let entry = keyring::Entry::new(APP_NAME, KEYRING_PASSWORD_ACCOUNT)?;
        entry.set_password(password.expose_secret())?;
        Ok(())
    }
}

/// Password-keyed transform applied to whole documents.
pub trait CryptoTransform: Send + Sync {
    /// Encrypts a serialized document.
    fn encrypt(&self, plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>>;

    /// Decrypts bytes produced by `encrypt`.
    fn decrypt(&self, ciphertext: &[u8], password: &SecretString) -> Result<Vec<u8>>;

    /// Returns true when `bytes` look like this transform's output.
    fn is_encrypted(&self, bytes: &[u8]) -> bool;
}

/// Core cryptographic logic for AES-256-GCM.
pub struct Encryptor;

impl Encryptor {
    /// Encrypts data using AES-256-GCM.
    /// Returns (ciphertext + tag, nonce).
    pub fn encrypt(data: &[u8], key: &[u8; KEY_LEN]) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
        let cipher = Aes256Gcm::new(key.into());
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        Ok((ciphertext, nonce_bytes))
    }

    /// Decrypts data using AES-256-GCM.
    pub fn decrypt(
        ciphertext: &[u8],
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(key.into());
        let nonce = Nonce::from_slice(nonce);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)
    }

    /// Derives a 32-byte key from a password and salt using Argon2id.
    pub fn derive_key(password: &SecretString, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
        let argon2 = Argon2::default();
        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
            .map_err(|e| EncryptionError::KeyDerivationFailed(e.to_string()))?;
        Ok(key)
    }

    /// Generates a random 16-byte salt for key derivation.
    pub fn generate_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        salt
    }
}

/// Argon2id + AES-256-GCM document transform.
///
/// Envelope layout: `magic[8] | salt[16] | nonce[12] | ciphertext+tag`.
/// Every call to `encrypt` draws a fresh salt and nonce.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmTransform;

impl CryptoTransform for AesGcmTransform {
    fn encrypt(&self, plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
        let salt = Encryptor::generate_salt();
        let key = Encryptor::derive_key(password, &salt)?;
        let (ciphertext, nonce) = Encryptor::encrypt(plaintext, &key)?;

        let mut out =
            Vec::with_capacity(ENVELOPE_MAGIC.len() + SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(ENVELOPE_MAGIC);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
        let header_len = ENVELOPE_MAGIC.len() + SALT_LEN + NONCE_LEN;
        if !self.is_encrypted(ciphertext) {
            return Err(EncryptionError::NotEncrypted);
        }
        if ciphertext.len() < header_len {
            return Err(EncryptionError::Truncated(ciphertext.len()));
        }

        let body = &ciphertext[ENVELOPE_MAGIC.len()..];
        let (salt, rest) = body.split_at(SALT_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| EncryptionError::Truncated(ciphertext.len()))?;

        let key = Encryptor::derive_key(password, salt)?;
        Encryptor::decrypt(sealed, &key, &nonce)
    }

    fn is_encrypted(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(ENVELOPE_MAGIC)
    }
}

/// Encrypts a serialized document with the default transform.
///
/// Used to prepare an encrypted base document ahead of time.
pub fn encrypt_document(plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
    AesGcmTransform.encrypt(plaintext, password)
}

/// Decrypts a document produced by [`encrypt_document`].
pub fn decrypt_document(ciphertext: &[u8], password: &SecretString) -> Result<Vec<u8>> {
    AesGcmTransform.decrypt(ciphertext, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serial_test::serial;

    fn password(value: &str) -> SecretString {
        SecretString::new(value.to_string().into())
    }

    #[test]
    fn test_encryption_roundtrip() {
        let key = [42u8; KEY_LEN];
        let data = b"sensitive data";

        let (ciphertext, nonce) = Encryptor::encrypt(data, &key).unwrap();
        let decrypted = Encryptor::decrypt(&ciphertext, &key, &nonce).unwrap();

        assert_eq!(data, decrypted.as_slice());
    }

    #[test]
    fn test_key_derivation() {
        let password = password("password");
        let salt = Encryptor::generate_salt();

        let key1 = Encryptor::derive_key(&password, &salt).unwrap();
        let key2 = Encryptor::derive_key(&password, &salt).unwrap();

        assert_eq!(key1, key2);

        let salt2 = Encryptor::generate_salt();
        let key3 = Encryptor::derive_key(&password, &salt2).unwrap();
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_envelope_starts_with_magic_and_hides_plaintext() {
        let sealed = AesGcmTransform
            .encrypt(br#"{"global":{"token":"abc"}}"#, &password("pw"))
            .unwrap();
        assert!(AesGcmTransform.is_encrypted(&sealed));
        assert!(!String::from_utf8_lossy(&sealed).contains("token"));

        let opened = AesGcmTransform.decrypt(&sealed, &password("pw")).unwrap();
        assert_eq!(opened, br#"{"global":{"token":"abc"}}"#);
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let sealed = encrypt_document(b"secret", &password("right")).unwrap();
        let err = decrypt_document(&sealed, &password("wrong")).unwrap_err();
        assert!(matches!(err, EncryptionError::DecryptionFailed));
    }

    #[test]
    fn test_encryption_is_randomized() {
        let first = encrypt_document(b"same", &password("pw")).unwrap();
        let second = encrypt_document(b"same", &password("pw")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_truncated_envelope_is_rejected() {
        let mut short = ENVELOPE_MAGIC.to_vec();
        short.extend_from_slice(&[0u8; 4]);
        let err = decrypt_document(&short, &password("pw")).unwrap_err();
        assert!(matches!(err, EncryptionError::Truncated(12)));

        let err = decrypt_document(b"plain", &password("pw")).unwrap_err();
        assert!(matches!(err, EncryptionError::NotEncrypted));
    }

    #[test]
    #[serial]
    fn test_password_from_env() {
        temp_env::with_var("STRATUM_TEST_DOC_PASSWORD", Some("from-env"), || {
            let resolved = PasswordSource::Env("STRATUM_TEST_DOC_PASSWORD".to_string())
                .resolve()
                .unwrap();
            assert_eq!(resolved.expose_secret(), "from-env");
        });

        temp_env::with_var_unset("STRATUM_TEST_DOC_PASSWORD", || {
            let err = PasswordSource::Env("STRATUM_TEST_DOC_PASSWORD".to_string())
                .resolve()
                .unwrap_err();
            assert!(matches!(err, EncryptionError::EnvError(_)));
        });
    }

    #[test]
    #[ignore = "requires an OS keyring"]
    fn test_password_from_keyring() {
        PasswordSource::store_in_keyring(&password("kept-in-keyring")).unwrap();
        let resolved = PasswordSource::Keyring.resolve().unwrap();
        assert_eq!(resolved.expose_secret(), "kept-in-keyring");
    }
}
