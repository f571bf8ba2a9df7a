//! # byok-batch
//!
//! Folder-level runner for the BYOK EML encrypter: loads configuration and
//! keys, then encrypts every `.eml` file of an input folder into an output
//! folder.

pub mod error;
pub mod orchestrator;
pub mod setup;

pub use error::{BatchError, BatchResult};
pub use orchestrator::{list_message_files, process_all, BatchSummary, FailedFile};
pub use setup::build_encrypter;
