//! Text encryption/decryption operations
//!
//! Glue between the command line and the codec: validates input, obtains
//! the secret, applies base64 armoring and writes results.

use crate::armor;
use crate::codec::{self, MIN_BLOB_LEN};
use crate::error::{AespassError, ErrorCategory, ErrorKind, Result};
use crate::kdf::SCRYPT_LOG_N;
use crate::secret::SecretReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// Encrypt `plaintext` with a secret from `secret_reader`, returning base64 text.
///
/// Empty plaintext is rejected before the secret is read.
pub fn encrypt_text(plaintext: &[u8], secret_reader: &mut dyn SecretReader) -> Result<String> {
    encrypt_text_with_log_n(plaintext, secret_reader, SCRYPT_LOG_N)
}

pub(crate) fn encrypt_text_with_log_n(
    plaintext: &[u8],
    secret_reader: &mut dyn SecretReader,
    log_n: u8,
) -> Result<String> {
    if plaintext.is_empty() {
        return Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "text is empty",
        ));
    }
    let secret = read_secret(secret_reader)?;
    let blob = codec::encrypt_with_log_n(plaintext, &secret, log_n)
        .map_err(|e| e.with_context("encryption failed"))?;
    Ok(armor::wrap(&blob))
}

/// Decrypt base64 text with a secret from `secret_reader`.
///
/// Empty text and blobs too short to have come from [`encrypt_text`] are
/// rejected before the secret is read or any key is derived.
pub fn decrypt_text(armored: &str, secret_reader: &mut dyn SecretReader) -> Result<Vec<u8>> {
    decrypt_text_with_log_n(armored, secret_reader, SCRYPT_LOG_N)
}

pub(crate) fn decrypt_text_with_log_n(
    armored: &str,
    secret_reader: &mut dyn SecretReader,
    log_n: u8,
) -> Result<Vec<u8>> {
    if armored.trim().is_empty() {
        return Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "text is empty",
        ));
    }
    let blob = armor::unwrap(armored).map_err(|e| e.with_context("failed to decode"))?;
    if blob.len() < MIN_BLOB_LEN {
        return Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            format!(
                "invalid input text: {} bytes after decoding, need at least {}",
                blob.len(),
                MIN_BLOB_LEN
            ),
        ));
    }
    let secret = read_secret(secret_reader)?;
    codec::decrypt_with_log_n(&blob, &secret, log_n)
        .map_err(|e| e.with_context("failed to decrypt"))
}

fn read_secret(secret_reader: &mut dyn SecretReader) -> Result<Zeroizing<Vec<u8>>> {
    let secret = secret_reader.read_secret()?;
    if secret.is_empty() {
        return Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "password or keyfile is empty",
        ));
    }
    Ok(secret)
}

/// Assign the positional `[TEXT] [PASSWORD]` arguments.
///
/// When the text comes from a file, a lone positional is the password, so
/// `encrypt -i FILE PASSWORD` works. Returns `(text, password)`.
pub fn resolve_positionals<'a>(
    first: Option<&'a str>,
    second: Option<&'a str>,
    has_input_file: bool,
) -> Result<(Option<&'a str>, Option<&'a str>)> {
    if !has_input_file {
        return Ok((first, second));
    }
    match (first, second) {
        (Some(_), Some(_)) => Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "give either text or --input, not both",
        )),
        (password, _) => Ok((None, password)),
    }
}

/// Resolve the command input: literal text if given, otherwise the contents
/// of `input_path`.
pub fn read_input(text: Option<&str>, input_path: Option<&Path>) -> Result<Vec<u8>> {
    match (text, input_path) {
        (Some(_), Some(_)) => Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "give either text or --input, not both",
        )),
        (Some(text), None) => Ok(text.as_bytes().to_vec()),
        (None, Some(path)) => fs::read(path).map_err(|e| read_error(path, e)),
        (None, None) => Err(AespassError::with_kind(
            ErrorCategory::User,
            ErrorKind::Input,
            "no text given; pass it as an argument or use --input",
        )),
    }
}

/// Write `contents` to `output_path`, or to stdout when no path is given.
///
/// Files are replaced atomically (tempfile + fsync + rename) and end up with
/// mode 0o600 on Unix systems.
pub fn write_output(output_path: Option<&Path>, contents: &[u8]) -> Result<()> {
    match output_path {
        Some(path) => write_file_atomic(path, contents)
            .map_err(|e| e.with_context(format!("failed to write to {}", path.display()))),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(contents)
                .and_then(|()| stdout.flush())
                .map_err(|e| {
                    AespassError::with_kind_and_source(
                        ErrorCategory::Internal,
                        ErrorKind::Io,
                        "failed to write to stdout",
                        e,
                    )
                })
        }
    }
}

fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                AespassError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        AespassError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> AespassError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    AespassError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::ConstantSecretReader;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    const TEST_LOG_N: u8 = 10;

    /// Panics if asked for a secret, proving validation ran first.
    struct UnreachableReader;

    impl SecretReader for UnreachableReader {
        fn read_secret(&mut self) -> Result<Zeroizing<Vec<u8>>> {
            panic!("secret must not be read for invalid input");
        }
    }

    fn reader(secret: &[u8]) -> ConstantSecretReader {
        ConstantSecretReader::new(secret.to_vec())
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let armored =
            encrypt_text_with_log_n(b"Encrypting this string", &mut reader(b"12345"), TEST_LOG_N)
                .unwrap();
        let decrypted =
            decrypt_text_with_log_n(&armored, &mut reader(b"12345"), TEST_LOG_N).unwrap();
        assert_eq!(decrypted, b"Encrypting this string");
    }

    #[test]
    fn test_armored_length() {
        let armored = encrypt_text_with_log_n(b"abc", &mut reader(b"k"), TEST_LOG_N).unwrap();
        let blob = armor::unwrap(&armored).unwrap();
        assert_eq!(blob.len(), codec::blob_len(3));
    }

    #[test]
    fn test_decrypt_wrong_secret() {
        let armored = encrypt_text_with_log_n(b"secret", &mut reader(b"correct"), TEST_LOG_N)
            .unwrap();
        let err = decrypt_text_with_log_n(&armored, &mut reader(b"wrong"), TEST_LOG_N)
            .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Authentication));
        assert!(err.chain_message().starts_with("failed to decrypt: "));
    }

    #[test]
    fn test_decrypt_tolerates_trailing_newline() {
        let armored = encrypt_text_with_log_n(b"hello", &mut reader(b"k"), TEST_LOG_N).unwrap();
        let decrypted =
            decrypt_text_with_log_n(&format!("{}\n", armored), &mut reader(b"k"), TEST_LOG_N)
                .unwrap();
        assert_eq!(decrypted, b"hello");
    }

    #[test]
    fn test_empty_plaintext_rejected() {
        let err = encrypt_text_with_log_n(b"", &mut UnreachableReader, TEST_LOG_N).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_empty_ciphertext_rejected() {
        let err = decrypt_text_with_log_n(" \n", &mut UnreachableReader, TEST_LOG_N).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_undecodable_ciphertext_is_format_error() {
        let err =
            decrypt_text_with_log_n("not base64!", &mut UnreachableReader, TEST_LOG_N).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Format));
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        let armored = armor::wrap(&[0u8; MIN_BLOB_LEN - 1]);
        let err = decrypt_text_with_log_n(&armored, &mut UnreachableReader, TEST_LOG_N)
            .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let err = encrypt_text_with_log_n(b"hello", &mut reader(b""), TEST_LOG_N).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_positionals_without_input_file() {
        assert_eq!(
            resolve_positionals(Some("text"), Some("pw"), false).unwrap(),
            (Some("text"), Some("pw"))
        );
        assert_eq!(
            resolve_positionals(Some("text"), None, false).unwrap(),
            (Some("text"), None)
        );
    }

    #[test]
    fn test_lone_positional_with_input_file_is_password() {
        assert_eq!(
            resolve_positionals(Some("12345"), None, true).unwrap(),
            (None, Some("12345"))
        );
        assert_eq!(resolve_positionals(None, None, true).unwrap(), (None, None));
    }

    #[test]
    fn test_text_and_input_file_together_rejected() {
        let err = resolve_positionals(Some("text"), Some("pw"), true).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_read_input_text() {
        assert_eq!(read_input(Some("hi"), None).unwrap(), b"hi");
    }

    #[test]
    fn test_read_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.bin");
        fs::write(&path, [0xffu8, 0x00]).unwrap();
        assert_eq!(read_input(None, Some(&path)).unwrap(), [0xff, 0x00]);
    }

    #[test]
    fn test_read_input_requires_exactly_one_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.txt");

        let err = read_input(None, None).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));

        let err = read_input(Some("hi"), Some(&path)).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Input));
    }

    #[test]
    fn test_read_input_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_input(None, Some(&temp_dir.path().join("missing"))).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.category, ErrorCategory::User);
    }

    #[test]
    fn test_write_output_replaces_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");
        fs::write(&path, b"old contents that are longer").unwrap();

        write_output(Some(&path), b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_output_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");

        write_output(Some(&path), b"secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
