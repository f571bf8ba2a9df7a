//! Comparison report model and writers.
//!
//! Field names serialize in camelCase so existing report consumers keep
//! working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::CompareResult;

/// JSON report file name.
pub const REPORT_JSON: &str = "report.json";

/// Markdown report file name.
pub const REPORT_MD: &str = "report.md";

/// File names present on one side only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDiff {
    pub only_in_encrypted: Vec<String>,
    pub only_in_decrypted: Vec<String>,
    pub common_count: usize,
}

/// Differences found for one file name present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmlDiff {
    pub filename: String,
    pub header_differences: Vec<String>,
    pub structure_differences: Vec<String>,
    pub notes: Vec<String>,
}

impl EmlDiff {
    /// Whether any header or structure difference was found.
    pub fn has_differences(&self) -> bool {
        !(self.header_differences.is_empty() && self.structure_differences.is_empty())
    }

    /// Whether the diff is worth reporting.
    pub fn is_reportable(&self) -> bool {
        self.has_differences() || !self.notes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
    pub generated_at: DateTime<Utc>,
    pub folder_diff: FolderDiff,
    pub eml_diffs: Vec<EmlDiff>,
}

/// Writes `report.json` and `report.md` into an output directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write both report files, creating `output_dir` when missing.
    ///
    /// Returns the paths of the JSON and Markdown files.
    pub fn write(&self, report: &CompareReport, output_dir: &Path) -> CompareResult<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(output_dir)?;

        let json_path = output_dir.join(REPORT_JSON);
        std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;

        let md_path = output_dir.join(REPORT_MD);
        std::fs::write(&md_path, to_markdown(report))?;

        info!(
            component = "compare",
            output = %output_dir.display(),
            diffs = report.eml_diffs.len(),
            "Report written"
        );
        Ok((json_path, md_path))
    }
}

/// Render a report as Markdown.
pub fn to_markdown(report: &CompareReport) -> String {
    let mut md = String::new();
    let folder = &report.folder_diff;

    // Writing to a String cannot fail
    let _ = writeln!(md, "# EML Comparison Report\n");
    let _ = writeln!(md, "- Generated at: {}\n", report.generated_at.to_rfc3339());

    let _ = writeln!(md, "## Folder differences\n");
    let _ = writeln!(md, "- Common files: {}", folder.common_count);
    let _ = writeln!(md, "- Only in encrypted: {}", folder.only_in_encrypted.len());
    let _ = writeln!(md, "- Only in decrypted: {}\n", folder.only_in_decrypted.len());

    write_file_list(&mut md, "Only in encrypted", &folder.only_in_encrypted);
    write_file_list(&mut md, "Only in decrypted", &folder.only_in_decrypted);

    let _ = writeln!(md, "## Content differences (unexpected)\n");
    if report.eml_diffs.is_empty() {
        md.push_str("No unexpected differences found among common files.\n");
        return md;
    }

    for diff in &report.eml_diffs {
        let _ = writeln!(md, "### {}\n", diff.filename);
        write_section(&mut md, "Header differences", &diff.header_differences, true);
        write_section(
            &mut md,
            "MIME structure / metadata differences",
            &diff.structure_differences,
            true,
        );
        write_section(&mut md, "Notes", &diff.notes, false);
    }
    md
}

fn write_file_list(md: &mut String, title: &str, files: &[String]) {
    if files.is_empty() {
        return;
    }
    let _ = writeln!(md, "### {}\n", title);
    for file in files {
        let _ = writeln!(md, "- {}", file);
    }
    md.push('\n');
}

fn write_section(md: &mut String, title: &str, items: &[String], multiline: bool) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(md, "**{}**\n", title);
    for item in items {
        let item = if multiline {
            // Markdown hard line breaks keep multi-line entries inside the bullet
            item.replace('\n', "  \n  ")
        } else {
            item.clone()
        };
        let _ = writeln!(md, "- {}", item);
    }
    md.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_report() -> CompareReport {
        CompareReport {
            generated_at: Utc::now(),
            folder_diff: FolderDiff {
                only_in_encrypted: vec!["extra.eml".into()],
                only_in_decrypted: vec![],
                common_count: 2,
            },
            eml_diffs: vec![EmlDiff {
                filename: "a.eml".into(),
                header_differences: vec![
                    "Header differs: subject\n  encrypted: [x]\n  decrypted: [y]".into(),
                ],
                structure_differences: vec![],
                notes: vec!["note".into()],
            }],
        }
    }

    #[test]
    fn test_has_differences_ignores_notes() {
        let diff = EmlDiff {
            filename: "a.eml".into(),
            notes: vec!["only a note".into()],
            ..Default::default()
        };
        assert!(!diff.has_differences());
        assert!(diff.is_reportable());
        assert!(!EmlDiff::default().is_reportable());
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&sample_report());

        assert!(md.starts_with("# EML Comparison Report\n\n- Generated at: "));
        assert!(md.contains("- Common files: 2\n"));
        assert!(md.contains("### Only in encrypted\n\n- extra.eml\n"));
        assert!(!md.contains("### Only in decrypted"));
        assert!(md.contains("### a.eml\n\n**Header differences**\n\n"));
        assert!(md.contains("- Header differs: subject  \n    encrypted: [x]"));
        assert!(md.contains("**Notes**\n\n- note\n"));
        assert!(!md.contains("MIME structure"));
    }

    #[test]
    fn test_markdown_without_diffs() {
        let mut report = sample_report();
        report.eml_diffs.clear();
        let md = to_markdown(&report);
        assert!(md.ends_with("No unexpected differences found among common files.\n"));
    }

    #[test]
    fn test_write_both_files() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("reports");

        let (json, md) = ReportWriter::new().write(&sample_report(), &out).unwrap();
        assert!(md.is_file());

        let text = std::fs::read_to_string(json).unwrap();
        assert!(text.contains("\"generatedAt\""));
        assert!(text.contains("\"onlyInEncrypted\""));
        assert!(text.contains("\"headerDifferences\""));

        let parsed: CompareReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.eml_diffs.len(), 1);
    }
}
