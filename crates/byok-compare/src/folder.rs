//! Folder-level comparison.

use byok_core::defaults::MESSAGE_EXTENSION;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::compare::EmlComparator;
use crate::error::{CompareError, CompareResult};
use crate::report::{CompareReport, FolderDiff};

/// Pairs message files of two folders by file name and compares each pair.
#[derive(Debug, Clone, Default)]
pub struct FolderComparer {
    comparator: EmlComparator,
}

impl FolderComparer {
    pub fn new(comparator: EmlComparator) -> Self {
        Self { comparator }
    }

    /// Compare every `.eml` file found under both folders.
    ///
    /// Files are matched by file name regardless of sub-directory; when a
    /// name occurs more than once on one side the first one found wins.
    #[instrument(skip(self), fields(component = "compare", op = "compare_folders"))]
    pub fn compare(&self, encrypted_dir: &Path, decrypted_dir: &Path) -> CompareResult<CompareReport> {
        let enc = list_emls_by_name(encrypted_dir)?;
        let dec = list_emls_by_name(decrypted_dir)?;

        let only_in_encrypted: Vec<String> =
            enc.keys().filter(|n| !dec.contains_key(*n)).cloned().collect();
        let only_in_decrypted: Vec<String> =
            dec.keys().filter(|n| !enc.contains_key(*n)).cloned().collect();

        let mut common_count = 0;
        let mut eml_diffs = Vec::new();
        for (name, enc_path) in &enc {
            let Some(dec_path) = dec.get(name) else {
                continue;
            };
            common_count += 1;
            let diff = self.comparator.compare(name, enc_path, dec_path);
            if diff.is_reportable() {
                eml_diffs.push(diff);
            }
        }

        info!(
            common = common_count,
            only_in_encrypted = only_in_encrypted.len(),
            only_in_decrypted = only_in_decrypted.len(),
            with_differences = eml_diffs.len(),
            "Folder comparison finished"
        );

        Ok(CompareReport {
            generated_at: Utc::now(),
            folder_diff: FolderDiff {
                only_in_encrypted,
                only_in_decrypted,
                common_count,
            },
            eml_diffs,
        })
    }
}

/// Message files under `dir`, recursively, keyed by file name.
pub fn list_emls_by_name(dir: &Path) -> CompareResult<BTreeMap<String, PathBuf>> {
    if !dir.is_dir() {
        return Err(CompareError::NotADirectory(dir.to_path_buf()));
    }

    let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_message = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(MESSAGE_EXTENSION));
        if !is_message {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(first) = files.get(&name) {
            warn!(
                file = %name,
                kept = %first.display(),
                skipped = %entry.path().display(),
                "Duplicate file name, keeping the first"
            );
            continue;
        }
        files.insert(name, entry.into_path());
    }
    Ok(files)
}
