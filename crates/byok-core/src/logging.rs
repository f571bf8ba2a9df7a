//! Structured logging conventions and subscriber setup.
//!
//! ## Field Names
//!
//! `tracing` call sites use these field names so that log aggregation can
//! query a batch run by file name or outcome:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `component` | "batch", "eml", "compare" |
//! | `op` | operation, e.g. "process_all", "encrypt_message", "key_check" |
//! | `file` | message file name (no directory) |
//! | `key_id` | configured key identifier |
//! | `fingerprint` | SHA-256 fingerprint of the wrapping public key |
//! | `duration_ms` | wall-clock duration in milliseconds |
//! | `leaf_count`, `container_count` | structure of one message |
//! | `processed`, `failed` | batch totals |
//! | `error` | failure cause |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A message failed and was skipped |
//! | WARN  | Recoverable issue: key self-check mismatch, key pair mismatch |
//! | INFO  | Batch start/finish, each processed file |
//! | DEBUG | Per-message structure counts, configuration choices |
//! | TRACE | Per-leaf events |

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::parse_bool_env;

// ─── Subscriber setup ──────────────────────────────────────────────────────

/// Install the global `tracing` subscriber for a binary.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: `default_filter`)
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_tracing(default_filter: &str, default_file_name: &str) -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok().filter(|p| !p.trim().is_empty());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|_| parse_bool_env("LOG_ANSI", false));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(default_file_name);
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            // no ANSI in files unless asked for
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Logs go to stderr so stdout stays free for reports
        if log_format == "json" {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            let mut layer = fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    tracing::info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

