//! `eml-compare`: compare encrypted EML files with their decrypted versions.
//!
//! ```text
//! eml-compare --encrypted-dir enc --decrypted-dir dec --output-dir reports \
//!     --ignore-header date --ignore-header received
//! ```

use anyhow::Context;
use byok_compare::{EmlComparator, FolderComparer, ReportWriter};
use byok_core::logging::init_tracing;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "eml-compare")]
#[command(about = "Compare encrypted and decrypted EML folders and write a report")]
#[command(version)]
struct Cli {
    /// Folder of encrypted messages
    #[arg(long, env = "COMPARE_ENCRYPTED_DIR")]
    encrypted_dir: PathBuf,

    /// Folder of decrypted messages
    #[arg(long, env = "COMPARE_DECRYPTED_DIR")]
    decrypted_dir: PathBuf,

    /// Folder receiving report.json and report.md
    #[arg(long, env = "COMPARE_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Header name to skip when comparing headers (repeatable)
    #[arg(long = "ignore-header", value_name = "NAME")]
    ignore_headers: Vec<String>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing("byok_compare=info", "eml-compare.log");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Comparison aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let comparer = FolderComparer::new(EmlComparator::new().with_ignored_headers(&cli.ignore_headers));
    let report = comparer
        .compare(&cli.encrypted_dir, &cli.decrypted_dir)
        .context("folder comparison failed")?;

    ReportWriter::new()
        .write(&report, &cli.output_dir)
        .context("failed to write report")?;

    let output = std::fs::canonicalize(&cli.output_dir).unwrap_or(cli.output_dir);
    println!("Report written to: {}", output.display());
    Ok(())
}
