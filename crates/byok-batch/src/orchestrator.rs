//! Folder-level batch run.
//!
//! Every `.eml` file directly inside the input folder is encrypted into a
//! file of the same name in the output folder. Files are processed one at a
//! time in name order. A failing file is logged and skipped; it never stops
//! the run.

use byok_core::defaults::MESSAGE_EXTENSION;
use byok_eml::{EmlResult, EnvelopeEncrypter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument};

use crate::error::{BatchError, BatchResult};

/// A file that could not be encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub file: String,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Names of files written to the output folder.
    pub processed: Vec<String>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// Encrypt every message file in `input_dir` into `output_dir`.
///
/// The output folder is created when missing. Only setup problems are
/// returned as errors; per-file failures end up in [`BatchSummary::failed`].
#[instrument(skip(encrypter), fields(component = "batch", op = "process_all"))]
pub fn process_all(
    input_dir: &Path,
    output_dir: &Path,
    encrypter: &EnvelopeEncrypter,
) -> BatchResult<BatchSummary> {
    let start = Instant::now();
    std::fs::create_dir_all(output_dir)?;

    if !input_dir.is_dir() {
        return Err(BatchError::NotADirectory(input_dir.to_path_buf()));
    }

    let files = list_message_files(input_dir)?;
    info!(
        input = %input_dir.display(),
        output = %output_dir.display(),
        files = files.len(),
        "Batch started"
    );

    let mut summary = BatchSummary::default();
    for path in files {
        let name = file_name(&path);
        match process_one(&path, &output_dir.join(&name), encrypter) {
            Ok(()) => {
                info!(file = %name, "Message encrypted");
                summary.processed.push(name);
            }
            Err(e) => {
                error!(file = %name, error = %e, "Failed processing message, skipping");
                summary.failed.push(FailedFile {
                    file: name,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        processed = summary.processed.len(),
        failed = summary.failed.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Batch finished"
    );
    Ok(summary)
}

/// Regular files ending in `.eml` (any case), sorted by file name.
pub fn list_message_files(dir: &Path) -> BatchResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_message_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

fn has_message_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(MESSAGE_EXTENSION))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Encrypt one file. The output appears only once fully written.
fn process_one(input: &Path, output: &Path, encrypter: &EnvelopeEncrypter) -> EmlResult<()> {
    let raw = std::fs::read(input)?;
    let encrypted = encrypter.encrypt_message(&raw)?;

    let dir = output.parent().unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&encrypted.bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| e.error)?;

    debug!(
        file = %file_name(output),
        bytes = encrypted.bytes.len(),
        leaf_count = encrypted.stats.leaf_count,
        "Output written"
    );
    Ok(())
}
