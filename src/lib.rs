//! aespass - Password-based text encryption using scrypt and AES-256-GCM
//!
//! A secret (password or keyfile contents) is stretched with scrypt into a
//! 256-bit key, which seals the payload with AES-256-GCM. The result is a
//! single self-describing blob, `nonce || ciphertext || tag || salt`,
//! usually presented as standard base64.

#![forbid(unsafe_code)]

pub mod armor;
pub mod codec;
pub mod error;
pub mod kdf;
pub mod secret;
pub mod text_ops;

pub use codec::{decrypt, encrypt};
pub use error::{AespassError, ErrorCategory, ErrorKind, Result};
