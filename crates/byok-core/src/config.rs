//! Encrypter configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file with a `[telemessage]` table (`${VAR}` placeholders are
//!   substituted from the environment before parsing)
//! - environment variables (`BYOK_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use byok_core::config::EncrypterConfig;
//!
//! // Explicit file, then $BYOK_CONFIG, then environment variables
//! let config = EncrypterConfig::load(None).expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = EncrypterConfig::from_file(std::path::Path::new("encrypter.toml"))
//!     .expect("Failed to load");
//! ```
//!
//! # File layout
//!
//! ```toml
//! [telemessage]
//! input_folder = "/data/in"
//! output_folder = "/data/out"
//! enc_key_id = "key-2024-01"
//! original_mesage_integrity = "${INTEGRITY_VALUE}"
//! verify_key_header = false
//!
//! [telemessage.rsa]
//! public_key_path = "/keys/public.pem"
//! private_key_path = "/keys/private.pem"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults::CONFIG_PATH_ENV;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Paths of the PEM-encoded RSA key files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaKeyPaths {
    /// Public key used to wrap content keys.
    pub public_key_path: PathBuf,
    /// Private key, only needed for the key header self-check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
}

/// Settings for one batch run of the encrypter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncrypterConfig {
    /// Directory of message files to encrypt.
    pub input_folder: PathBuf,
    /// Directory receiving the encrypted message files.
    pub output_folder: PathBuf,
    /// Key file locations.
    pub rsa: RsaKeyPaths,
    /// Value of the key identifier header.
    #[serde(default)]
    pub enc_key_id: String,
    /// Value of the integrity pass-through header.
    #[serde(default)]
    pub original_mesage_integrity: String,
    /// Unwrap each written key header again and compare (warn only).
    #[serde(default)]
    pub verify_key_header: bool,
}

impl EncrypterConfig {
    /// Load configuration.
    ///
    /// Resolution order:
    /// 1. `path`, when given
    /// 2. the file named by `$BYOK_CONFIG`
    /// 3. environment variables
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            info!("Loading encrypter config from: {}", path.display());
            return Self::from_file(path);
        }

        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                info!("Loading encrypter config from ${}: {}", CONFIG_PATH_ENV, path);
                Self::from_file(Path::new(path.trim()))
            }
            _ => {
                debug!("No config file given, using environment variables");
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = Self::substitute_env_vars(content);

        #[derive(Deserialize)]
        struct TomlRoot {
            telemessage: EncrypterConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.telemessage.validate()?;
        Ok(root.telemessage)
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BYOK_INPUT_FOLDER`
    /// - `BYOK_OUTPUT_FOLDER`
    /// - `BYOK_PUBLIC_KEY_PATH`
    /// - `BYOK_PRIVATE_KEY_PATH` (optional)
    /// - `BYOK_ENC_KEY_ID`
    /// - `BYOK_ORIGINAL_MESAGE_INTEGRITY`
    /// - `BYOK_VERIFY_KEY_HEADER` (default: false)
    pub fn from_env() -> Self {
        Self {
            input_folder: env::var("BYOK_INPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_default(),
            output_folder: env::var("BYOK_OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_default(),
            rsa: RsaKeyPaths {
                public_key_path: env::var("BYOK_PUBLIC_KEY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_default(),
                private_key_path: env::var("BYOK_PRIVATE_KEY_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
            },
            enc_key_id: env::var("BYOK_ENC_KEY_ID").unwrap_or_default(),
            original_mesage_integrity: env::var("BYOK_ORIGINAL_MESAGE_INTEGRITY")
                .unwrap_or_default(),
            verify_key_header: parse_bool_env("BYOK_VERIFY_KEY_HEADER", false),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.input_folder.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "input_folder must be set".to_string(),
            ));
        }
        if self.output_folder.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_folder must be set".to_string(),
            ));
        }
        if self.rsa.public_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "rsa.public_key_path must be set".to_string(),
            ));
        }
        if self.verify_key_header && self.rsa.private_key_path.is_none() {
            return Err(ConfigError::Validation(
                "verify_key_header requires rsa.private_key_path".to_string(),
            ));
        }
        if self.enc_key_id.trim().is_empty() {
            debug!("enc_key_id is empty, key id header will be blank");
        }
        if self.original_mesage_integrity.trim().is_empty() {
            debug!("original_mesage_integrity is empty, integrity header will be blank");
        }
        Ok(())
    }

    /// Replace `${VAR}` placeholders with environment values.
    ///
    /// Unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        let re = match regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}

/// Parse a boolean environment variable.
///
/// "true", "1", "yes", "on" (case-insensitive) are truthy.
pub fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|val| match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TOML: &str = r#"
[telemessage]
input_folder = "/data/in"
output_folder = "/data/out"
enc_key_id = "key-2024-01"
original_mesage_integrity = "integrity-marker"
verify_key_header = true

[telemessage.rsa]
public_key_path = "/keys/public.pem"
private_key_path = "/keys/private.pem"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = EncrypterConfig::from_toml_str(FULL_TOML).unwrap();

        assert_eq!(config.input_folder, PathBuf::from("/data/in"));
        assert_eq!(config.output_folder, PathBuf::from("/data/out"));
        assert_eq!(config.enc_key_id, "key-2024-01");
        assert_eq!(config.original_mesage_integrity, "integrity-marker");
        assert!(config.verify_key_header);
        assert_eq!(
            config.rsa.private_key_path,
            Some(PathBuf::from("/keys/private.pem"))
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let toml = r#"
[telemessage]
input_folder = "in"
output_folder = "out"

[telemessage.rsa]
public_key_path = "public.pem"
"#;
        let config = EncrypterConfig::from_toml_str(toml).unwrap();

        assert!(!config.verify_key_header);
        assert!(config.rsa.private_key_path.is_none());
        assert_eq!(config.enc_key_id, "");
    }

    #[test]
    fn test_verify_requires_private_key() {
        let toml = r#"
[telemessage]
input_folder = "in"
output_folder = "out"
verify_key_header = true

[telemessage.rsa]
public_key_path = "public.pem"
"#;
        let result = EncrypterConfig::from_toml_str(toml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_input_folder_rejected() {
        let config = EncrypterConfig {
            output_folder: "out".into(),
            rsa: RsaKeyPaths {
                public_key_path: "public.pem".into(),
                private_key_path: None,
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("input_folder"));
    }

    #[test]
    fn test_missing_table_is_parse_error() {
        let result = EncrypterConfig::from_toml_str("[other]\nkey = 1\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_env_var_substitution_with_value() {
        let content = "enc_key_id = \"${BYOK_TEST_SUBSTITUTION_VAR}\"";

        env::set_var("BYOK_TEST_SUBSTITUTION_VAR", "kid-7");
        let result = EncrypterConfig::substitute_env_vars(content);
        env::remove_var("BYOK_TEST_SUBSTITUTION_VAR");

        assert_eq!(result, "enc_key_id = \"kid-7\"");
    }

    #[test]
    fn test_env_var_substitution_missing() {
        let content = "enc_key_id = \"${BYOK_NONEXISTENT_TEST_VAR_12345}\"";
        let result = EncrypterConfig::substitute_env_vars(content);
        assert_eq!(result, content);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encrypter.toml");
        std::fs::write(&path, FULL_TOML).unwrap();

        let config = EncrypterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.enc_key_id, "key-2024-01");
    }

    #[test]
    fn test_from_file_missing() {
        let result = EncrypterConfig::from_file(Path::new("/nonexistent/encrypter.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_parse_bool_env() {
        env::set_var("BYOK_TEST_BOOL_ON", "Yes");
        env::set_var("BYOK_TEST_BOOL_OFF", "0");
        env::set_var("BYOK_TEST_BOOL_JUNK", "maybe");

        assert!(parse_bool_env("BYOK_TEST_BOOL_ON", false));
        assert!(!parse_bool_env("BYOK_TEST_BOOL_OFF", true));
        assert!(parse_bool_env("BYOK_TEST_BOOL_JUNK", true));
        assert!(!parse_bool_env("BYOK_TEST_BOOL_UNSET_98765", false));

        env::remove_var("BYOK_TEST_BOOL_ON");
        env::remove_var("BYOK_TEST_BOOL_OFF");
        env::remove_var("BYOK_TEST_BOOL_JUNK");
    }
}
