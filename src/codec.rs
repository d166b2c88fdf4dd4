//! Encryption/decryption using scrypt + AES-256-GCM
//!
//! The binary format ("blob") is:
//! - nonce: 12 bytes
//! - ciphertext: variable length, same as the plaintext
//! - tag: 16 bytes (GCM authentication tag)
//! - salt: 32 bytes
//!
//! Nothing is length-prefixed. The salt is the last [`SALT_LEN`] bytes and
//! the nonce is the first [`NONCE_LEN`] bytes of what remains.

use crate::error::{AespassError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, DerivedKey, SALT_LEN, SCRYPT_LOG_N, Salt};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

/// Length of the AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Smallest blob encryption can produce (empty plaintext)
pub const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN + SALT_LEN;

/// Length of the blob produced for a plaintext of `plaintext_len` bytes.
pub const fn blob_len(plaintext_len: usize) -> usize {
    NONCE_LEN + plaintext_len + TAG_LEN + SALT_LEN
}

fn cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn authentication_failed() -> AespassError {
    AespassError::with_kind(
        ErrorCategory::User,
        ErrorKind::Authentication,
        "corrupt input, tampered-with data, or bad password",
    )
}

/// Seal `plaintext` under `key` with a fresh random nonce.
///
/// Returns `nonce || ciphertext || tag`.
pub fn seal(plaintext: &[u8], key: &DerivedKey) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    kdf::fill_random(&mut nonce, "nonce")?;
    seal_with_nonce(plaintext, key, &nonce)
}

fn seal_with_nonce(
    plaintext: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let ciphertext = cipher(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| {
            AespassError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::Cipher,
                format!("encryption failed: {}", e),
            )
        })?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Verify and decrypt `nonce || ciphertext || tag` under `key`.
///
/// Input too short to hold a nonce is reported the same way as a bad tag.
pub fn open(sealed: &[u8], key: &DerivedKey) -> Result<Vec<u8>> {
    let Some((nonce, ciphertext)) = sealed.split_at_checked(NONCE_LEN) else {
        return Err(authentication_failed());
    };

    cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| authentication_failed())
}

/// Encrypt plaintext with a password using random salt and nonce
///
/// Returns the blob: nonce(12) + ciphertext(variable) + tag(16) + salt(32)
pub fn encrypt(plaintext: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    encrypt_with_log_n(plaintext, secret, SCRYPT_LOG_N)
}

pub(crate) fn encrypt_with_log_n(plaintext: &[u8], secret: &[u8], log_n: u8) -> Result<Vec<u8>> {
    let (key, salt) = kdf::derive_with_log_n(secret, None, log_n)?;
    let mut blob = seal(plaintext, &key)?;
    blob.extend_from_slice(salt.as_bytes());
    tracing::debug!(
        plaintext_len = plaintext.len(),
        blob_len = blob.len(),
        "sealed blob"
    );
    Ok(blob)
}

/// Encrypt plaintext with a password using provided salt and nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - reusing a nonce under the same key destroys
/// GCM's confidentiality and integrity. Always use `encrypt()`.
pub fn encrypt_deterministic(
    plaintext: &[u8],
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let salt = Salt::from_bytes(*salt);
    let (key, salt) = kdf::derive(secret, Some(&salt))?;
    let mut blob = seal_with_nonce(plaintext, &key, nonce)?;
    blob.extend_from_slice(salt.as_bytes());
    Ok(blob)
}

/// Decrypt a blob with a password
pub fn decrypt(blob: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    decrypt_with_log_n(blob, secret, SCRYPT_LOG_N)
}

pub(crate) fn decrypt_with_log_n(blob: &[u8], secret: &[u8], log_n: u8) -> Result<Vec<u8>> {
    // Checked before the KDF runs so that garbage input is cheap to reject.
    if blob.len() < MIN_BLOB_LEN {
        return Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Format,
            format!(
                "input likely truncated: {} bytes, need at least {}",
                blob.len(),
                MIN_BLOB_LEN
            ),
        ));
    }

    let (sealed, salt) = blob.split_at(blob.len() - SALT_LEN);
    let salt = Salt::try_from(salt)?;
    let (key, _) = kdf::derive_with_log_n(secret, Some(&salt), log_n)?;
    let plaintext = open(sealed, &key)?;
    tracing::debug!(blob_len = blob.len(), "opened blob");
    Ok(plaintext)
}
