//! Text presentation of blobs
//!
//! Blobs are shown to humans as standard base64 (RFC 4648 alphabet, with
//! padding). There is no prefix or version marker.

use crate::error::{AespassError, ErrorCategory, ErrorKind, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode a blob as base64 text
pub fn wrap(blob: &[u8]) -> String {
    STANDARD.encode(blob)
}

/// Decode base64 text back into a blob
///
/// Leading and trailing whitespace is ignored so that text pasted from a
/// terminal or read from a file ending in a newline still decodes.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    STANDARD.decode(armored.trim()).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Format,
            format!("base64 decoding failed: {}", e),
            e,
        )
    })
}
