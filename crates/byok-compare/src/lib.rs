//! # byok-compare
//!
//! Checks that encryption kept everything except payloads intact by
//! comparing a folder of encrypted messages with a folder of their
//! decrypted counterparts.
//!
//! ```rust,no_run
//! use byok_compare::{EmlComparator, FolderComparer, ReportWriter};
//! use std::path::Path;
//!
//! let comparer = FolderComparer::new(EmlComparator::new().with_ignored_headers(["date"]));
//! let report = comparer.compare(Path::new("encrypted"), Path::new("decrypted")).unwrap();
//! ReportWriter::new().write(&report, Path::new("output")).unwrap();
//! ```

pub mod canon;
pub mod compare;
pub mod error;
pub mod folder;
pub mod report;

pub use compare::EmlComparator;
pub use error::{CompareError, CompareResult};
pub use folder::{list_emls_by_name, FolderComparer};
pub use report::{to_markdown, CompareReport, EmlDiff, FolderDiff, ReportWriter};
