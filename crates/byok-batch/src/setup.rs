//! Build an [`EnvelopeEncrypter`] from configuration.

use byok_core::EncrypterConfig;
use byok_crypto::RsaKeyPair;
use byok_eml::{EnvelopeEncrypter, EnvelopeSettings};
use tracing::{info, warn};

use crate::error::BatchResult;

/// Load the configured key pair and wrap it in an encrypter.
///
/// A private key that does not match the public key is reported but not
/// fatal; the self-check will flag every message in that case.
pub fn build_encrypter(config: &EncrypterConfig) -> BatchResult<EnvelopeEncrypter> {
    config.validate()?;

    let keys = RsaKeyPair::load(
        &config.rsa.public_key_path,
        config.rsa.private_key_path.as_deref(),
    )?;

    if keys.keys_match() == Some(false) {
        warn!(
            component = "batch",
            public_key = %config.rsa.public_key_path.display(),
            "Private key does not match the public key; key header self-check will fail"
        );
    }

    info!(
        component = "batch",
        fingerprint = %keys.fingerprint()?,
        key_id = %config.enc_key_id,
        verify_key_header = config.verify_key_header,
        has_private_key = keys.private.is_some(),
        "Wrapping key loaded"
    );

    Ok(EnvelopeEncrypter::new(keys, EnvelopeSettings::from(config)))
}
