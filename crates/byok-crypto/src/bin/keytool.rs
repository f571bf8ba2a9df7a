//! byok-keytool: Command-line tool for RSA key material.
//!
//! Generates wrapping key pairs, prints fingerprints, and checks that a
//! public/private key pair belongs together before a batch run.

use byok_crypto::{
    fingerprint, generate_key, generate_key_pair, generate_nonce, load_private_key,
    load_public_key, save_private_key, save_public_key, unwrap, wrap,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "byok-keytool")]
#[command(author, version, about = "RSA key material for the BYOK EML encrypter")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new RSA key pair as PEM files
    Keygen {
        /// Modulus size in bits (minimum 2048)
        #[arg(short, long, default_value_t = 2048)]
        bits: usize,

        /// Output directory for keys (default: current directory)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Print the SHA-256 fingerprint of a public key
    Fingerprint {
        /// Path to public key file
        #[arg(short = 'k', long)]
        public_key: PathBuf,
    },

    /// Check that a public and a private key belong together
    CheckPair {
        /// Path to public key file
        #[arg(long)]
        public_key: PathBuf,

        /// Path to private key file
        #[arg(long)]
        private_key: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Keygen { bits, output } => cmd_keygen(bits, &output),
        Commands::Fingerprint { public_key } => cmd_fingerprint(&public_key),
        Commands::CheckPair {
            public_key,
            private_key,
        } => cmd_check_pair(&public_key, &private_key),
    }
}

fn cmd_keygen(bits: usize, output_dir: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let pair = generate_key_pair(bits)?;

    std::fs::create_dir_all(output_dir)?;
    let private_path = output_dir.join("private.pem");
    let public_path = output_dir.join("public.pem");

    let private = pair
        .private
        .as_ref()
        .ok_or("generated key pair has no private key")?;
    save_private_key(private, &private_path)?;
    save_public_key(&pair.public, &public_path)?;

    let output = serde_json::json!({
        "bits": bits,
        "fingerprint": pair.fingerprint()?,
        "private_key_path": private_path.to_string_lossy(),
        "public_key_path": public_path.to_string_lossy(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(true)
}

fn cmd_fingerprint(public_key_path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let public_key = load_public_key(public_key_path)?;

    let output = serde_json::json!({
        "public_key_path": public_key_path.to_string_lossy(),
        "fingerprint": fingerprint(&public_key)?,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(true)
}

fn cmd_check_pair(
    public_key_path: &Path,
    private_key_path: &Path,
) -> Result<bool, Box<dyn std::error::Error>> {
    let public_key = load_public_key(public_key_path)?;
    let private_key = load_private_key(private_key_path)?;

    let modulus_match = private_key.to_public_key() == public_key;

    // Exercise the real header path, not just the key parameters
    let key = generate_key();
    let nonce = generate_nonce();
    let header = wrap(&nonce, &key, &public_key)?;
    let roundtrip = match unwrap(&header, &private_key) {
        Ok((key2, nonce2)) => key2 == key && nonce2 == nonce,
        Err(_) => false,
    };

    let matched = modulus_match && roundtrip;
    let output = serde_json::json!({
        "public_key_path": public_key_path.to_string_lossy(),
        "private_key_path": private_key_path.to_string_lossy(),
        "fingerprint": fingerprint(&public_key)?,
        "modulus_match": modulus_match,
        "header_roundtrip": roundtrip,
        "match": matched,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(matched)
}
