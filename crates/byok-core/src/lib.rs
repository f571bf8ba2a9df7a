//! # byok-core
//!
//! Shared foundation for the BYOK EML encrypter workspace.
//!
//! This crate provides:
//! - [`config`]: the encrypter configuration (TOML file, environment, validation)
//! - [`defaults`]: wire-level constants shared by every crate
//! - [`logging`]: logging conventions and subscriber setup

pub mod config;
pub mod defaults;
pub mod logging;

pub use config::{parse_bool_env, ConfigError, ConfigResult, EncrypterConfig, RsaKeyPaths};
