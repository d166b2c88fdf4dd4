//! Key derivation from a password or keyfile contents using scrypt
//!
//! The scrypt cost is a fixed protocol constant. Blobs carry no parameter
//! header, so changing any of these values makes every existing blob
//! undecryptable.

use crate::error::{AespassError, ErrorCategory, ErrorKind, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use std::fmt;
use std::time::Instant;
use zeroize::Zeroizing;

/// Length of salt in bytes. The salt is recovered by slicing the tail of a
/// blob, so this length is part of the blob layout.
pub const SALT_LEN: usize = 32;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// scrypt N parameter (CPU/memory cost), 32 times the scrypt minimum
/// recommendation of 16384.
pub const SCRYPT_N: u32 = 16384 * 32;

/// log2 of [`SCRYPT_N`], the form scrypt's params take
pub const SCRYPT_LOG_N: u8 = 19;

/// scrypt r parameter (block size)
pub const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
pub const SCRYPT_P: u32 = 1;

const _: () = assert!(1u32 << SCRYPT_LOG_N == SCRYPT_N);

/// Random salt mixed into key derivation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draws a fresh salt from the operating system's secure random source.
    pub fn random() -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        fill_random(&mut salt, "salt")?;
        Ok(Self(salt))
    }

    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Salt {
    type Error = AespassError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let salt: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            AespassError::with_kind(
                ErrorCategory::User,
                ErrorKind::Format,
                format!("salt must be {} bytes, got {}", SALT_LEN, bytes.len()),
            )
        })?;
        Ok(Self(salt))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({} bytes)", SALT_LEN)
    }
}

/// A 32-byte symmetric key. Wiped from memory on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derive a key from `secret` and `salt` at the protocol cost.
///
/// When `salt` is `None` a fresh random salt is generated. The salt actually
/// used is returned alongside the key so that it can be stored in the blob.
/// Deterministic for a given `(secret, salt)` pair.
pub fn derive(secret: &[u8], salt: Option<&Salt>) -> Result<(DerivedKey, Salt)> {
    derive_with_log_n(secret, salt, SCRYPT_LOG_N)
}

/// Same as [`derive`] with an explicit scrypt cost. Only reachable from
/// inside the crate so that unit tests need not pay 512 MiB per derivation.
pub(crate) fn derive_with_log_n(
    secret: &[u8],
    salt: Option<&Salt>,
    log_n: u8,
) -> Result<(DerivedKey, Salt)> {
    let salt = match salt {
        Some(salt) => *salt,
        None => Salt::random()?,
    };

    let params = Params::new(log_n, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Derivation,
            "failed to create scrypt params",
            e,
        )
    })?;

    let started = Instant::now();
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(secret, salt.as_bytes(), &params, &mut key[..]).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Derivation,
            "scrypt key derivation failed",
            e,
        )
    })?;
    tracing::debug!(
        log_n,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "derived key"
    );

    Ok((DerivedKey(key), salt))
}

/// Fill `buf` from the OS random source. Failures are surfaced, never retried.
pub(crate) fn fill_random(buf: &mut [u8], what: &str) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Derivation,
            format!("secure random source failed while generating {}", what),
            e,
        )
    })
}
