//! aespass CLI - Password-based text encryption
//!
//! Command-line interface for encrypting and decrypting text using
//! AES-256-GCM with scrypt key derivation.

use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use aespass::AespassError;
use aespass::secret::{
    ConstantSecretReader, KeyfileSecretReader, ReaderSecretReader, SecretReader,
    TerminalSecretReader,
};
use aespass::text_ops;

#[derive(Parser)]
#[command(name = "aespass")]
#[command(version)]
#[command(about = "Encrypt and decrypt text with AES using a password or keyfile.", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text; prints the result as base64
    #[command(alias = "e")]
    Encrypt(CryptArgs),

    /// Decrypt base64 text produced by encrypt
    #[command(alias = "d")]
    Decrypt(CryptArgs),
}

#[derive(Args)]
struct CryptArgs {
    /// Text to encrypt or decrypt
    #[arg(required_unless_present = "input")]
    text: Option<String>,

    /// Password. Visible to other local users via the process list; prefer
    /// the prompt, --keyfile or --passphrase-stdin. With --input, a single
    /// positional argument is taken as the password
    password: Option<String>,

    /// Read the text from FILE instead of the command line
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Use the full contents of FILE as the secret
    #[arg(short, long, value_name = "FILE", env = "AESPASS_KEYFILE")]
    keyfile: Option<PathBuf>,

    /// Write the result to FILE (mode 0600) instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (verb, result) = match cli.command {
        Commands::Encrypt(args) => ("encrypting", encrypt(&args, cli.passphrase_stdin)),
        Commands::Decrypt(args) => ("decrypting", decrypt(&args, cli.passphrase_stdin)),
    };

    if let Err(e) = result {
        print_error(&format!("error {}: {}", verb, e.chain_message()));
        process::exit(1);
    }
}

fn encrypt(args: &CryptArgs, passphrase_stdin: bool) -> aespass::Result<()> {
    let (text, password) = text_ops::resolve_positionals(
        args.text.as_deref(),
        args.password.as_deref(),
        args.input.is_some(),
    )?;
    let plaintext = text_ops::read_input(text, args.input.as_deref())?;
    let mut reader = get_secret_reader(password, args.keyfile.as_deref(), passphrase_stdin);
    let armored = text_ops::encrypt_text(&plaintext, &mut *reader)?;

    match &args.output {
        Some(path) => {
            text_ops::write_output(Some(path), armored.as_bytes())?;
            print_success(&format!("encrypted text written to {}", path.display()));
        }
        None => text_ops::write_output(None, format!("{}\n", armored).as_bytes())?,
    }
    Ok(())
}

fn decrypt(args: &CryptArgs, passphrase_stdin: bool) -> aespass::Result<()> {
    let (text, password) = text_ops::resolve_positionals(
        args.text.as_deref(),
        args.password.as_deref(),
        args.input.is_some(),
    )?;
    let armored = read_armored(text, args.input.as_deref())?;
    let mut reader = get_secret_reader(password, args.keyfile.as_deref(), passphrase_stdin);
    let mut plaintext = text_ops::decrypt_text(&armored, &mut *reader)?;

    match &args.output {
        Some(path) => {
            text_ops::write_output(Some(path), &plaintext)?;
            print_success(&format!("decrypted text written to {}", path.display()));
        }
        None => {
            if io::stdout().is_terminal() {
                plaintext.push(b'\n');
            }
            text_ops::write_output(None, &plaintext)?;
        }
    }
    Ok(())
}

fn read_armored(text: Option<&str>, input: Option<&Path>) -> aespass::Result<String> {
    let bytes = text_ops::read_input(text, input)?;
    String::from_utf8(bytes).map_err(|e| {
        AespassError::with_kind_and_source(
            aespass::ErrorCategory::User,
            aespass::ErrorKind::Format,
            "encrypted input is not valid UTF-8",
            e,
        )
    })
}

fn get_secret_reader(
    password: Option<&str>,
    keyfile: Option<&Path>,
    passphrase_stdin: bool,
) -> Box<dyn SecretReader> {
    if let Some(password) = password {
        if let Some(keyfile) = keyfile {
            tracing::warn!(
                keyfile = %keyfile.display(),
                "password argument given; ignoring --keyfile"
            );
        }
        Box::new(ConstantSecretReader::new(password.as_bytes().to_vec()))
    } else if let Some(keyfile) = keyfile {
        Box::new(KeyfileSecretReader::new(keyfile))
    } else if passphrase_stdin {
        Box::new(ReaderSecretReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalSecretReader::new())
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "aespass=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialized");
    }
}

fn print_success(msg: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", msg.green());
    } else {
        eprintln!("{}", msg);
    }
}

fn print_error(msg: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}
