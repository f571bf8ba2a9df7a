//! `byok-encrypter`: encrypt a folder of EML files.
//!
//! ```text
//! byok-encrypter --config encrypter.toml
//! byok-encrypter --input-folder in --output-folder out --public-key public.pem
//! byok-encrypter --config encrypter.toml --key-id key-2024-01 --integrity sha256-pass
//! ```

use anyhow::Context;
use byok_batch::{build_encrypter, process_all};
use byok_core::logging::init_tracing;
use byok_core::EncrypterConfig;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "byok-encrypter")]
#[command(about = "Envelope-encrypt EML files with a customer RSA key")]
#[command(version)]
struct Cli {
    /// TOML configuration file (falls back to $BYOK_CONFIG, then BYOK_* variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the input folder
    #[arg(long)]
    input_folder: Option<PathBuf>,

    /// Override the output folder
    #[arg(long)]
    output_folder: Option<PathBuf>,

    /// Override the public key path
    #[arg(long)]
    public_key: Option<PathBuf>,

    /// Override the private key path
    #[arg(long)]
    private_key: Option<PathBuf>,

    /// Override the key identifier header value
    #[arg(long)]
    key_id: Option<String>,

    /// Override the integrity header value
    #[arg(long)]
    integrity: Option<String>,

    /// Unwrap every written key header again and compare
    #[arg(long)]
    verify_key_header: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing("byok_batch=info,byok_eml=info", "byok-encrypter.log");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Batch run aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let encrypter = build_encrypter(&config).context("failed to set up encrypter")?;

    let summary = process_all(&config.input_folder, &config.output_folder, &encrypter)
        .context("batch run failed")?;

    info!(
        processed = summary.processed.len(),
        failed = summary.failed.len(),
        "Done"
    );
    for failed in &summary.failed {
        eprintln!("Failed: {}: {}", failed.file, failed.error);
    }
    Ok(())
}

/// Load configuration and apply command line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<EncrypterConfig> {
    let has_overrides = cli.input_folder.is_some()
        || cli.output_folder.is_some()
        || cli.public_key.is_some();

    // With explicit folders and key on the command line, a file is optional
    let mut config = if cli.config.is_none() && has_overrides {
        EncrypterConfig::from_env()
    } else {
        EncrypterConfig::load(cli.config.as_deref()).context("failed to load configuration")?
    };

    apply_overrides(cli, &mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut EncrypterConfig) {
    if let Some(path) = &cli.input_folder {
        config.input_folder = path.clone();
    }
    if let Some(path) = &cli.output_folder {
        config.output_folder = path.clone();
    }
    if let Some(path) = &cli.public_key {
        config.rsa.public_key_path = path.clone();
    }
    if let Some(path) = &cli.private_key {
        config.rsa.private_key_path = Some(path.clone());
    }
    if let Some(key_id) = &cli.key_id {
        config.enc_key_id = key_id.clone();
    }
    if let Some(integrity) = &cli.integrity {
        config.original_mesage_integrity = integrity.clone();
    }
    if cli.verify_key_header {
        config.verify_key_header = true;
    }
}
