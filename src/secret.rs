//! Secret acquisition
//!
//! The codec only ever sees a byte string. Where those bytes come from (a
//! password typed on the command line, the contents of a keyfile, stdin, or
//! a no-echo terminal prompt) is decided here.

use crate::error::{AespassError, ErrorCategory, ErrorKind, Result};
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

/// Trait for reading secrets from various sources
pub trait SecretReader {
    /// Read a secret as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the secret wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed secret, e.g. a password given as a command-line argument
pub struct ConstantSecretReader {
    secret: Zeroizing<Vec<u8>>,
}

impl ConstantSecretReader {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
        }
    }
}

impl SecretReader for ConstantSecretReader {
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        tracing::trace!("using literal secret");
        Ok(Zeroizing::new((*self.secret).clone()))
    }
}

/// Uses the full, unmodified contents of a file as the secret
pub struct KeyfileSecretReader {
    path: PathBuf,
}

impl KeyfileSecretReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretReader for KeyfileSecretReader {
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        tracing::debug!(path = %self.path.display(), "reading keyfile");
        let contents = fs::read(&self.path).map_err(|e| {
            let category = if e.kind() == io::ErrorKind::NotFound {
                ErrorCategory::User
            } else {
                ErrorCategory::Internal
            };
            AespassError::with_kind_and_source(
                category,
                ErrorKind::SecretUnavailable,
                format!("failed to read keyfile {}", self.path.display()),
                e,
            )
        })?;
        Ok(Zeroizing::new(contents))
    }
}

/// Reads the secret from any io::Read source until EOF
pub struct ReaderSecretReader {
    reader: Box<dyn Read>,
}

impl ReaderSecretReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl SecretReader for ReaderSecretReader {
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            AespassError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        Ok(data)
    }
}

/// Reads a password from terminal with no echo
pub struct TerminalSecretReader;

impl TerminalSecretReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalSecretReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretReader for TerminalSecretReader {
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 secrets, use --keyfile or --passphrase-stdin instead.
    fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(AespassError::with_kind(
                ErrorCategory::User,
                ErrorKind::SecretUnavailable,
                "no password given and stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Password (aespass): ").map_err(|e| {
            AespassError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            AespassError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // rpassword returns a String, which is not zeroized until we wrap it
        let password = rpassword::read_password().map_err(|e| {
            AespassError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::SecretUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password.into_bytes()))
    }
}
