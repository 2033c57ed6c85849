//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 signing keys and a ready-made configuration.

use auth_service::config::{
    Config, DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS, DEFAULT_JWT_CLOCK_SKEW_SECONDS,
    DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS, DEFAULT_TEACHER_EMAIL_DOMAIN, MIN_BCRYPT_COST,
};
use base64::engine::general_purpose;
use base64::Engine;
use common::secret::SecretBox;
use ring::signature::Ed25519KeyPair;
use thiserror::Error;

/// DER prefix of a PKCS#8 v1 Ed25519 private key (RFC 8410), followed by the 32-byte seed.
const PKCS8_V1_ED25519_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Generate a deterministic Ed25519 signing key in PKCS#8 form.
///
/// The same seed always produces the same key, so token `kid`s are stable
/// across test runs.
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1)?;
/// assert_eq!(key, test_signing_key(1)?);
/// assert_ne!(key, test_signing_key(2)?);
/// ```
pub fn test_signing_key(seed: u8) -> Result<Vec<u8>, FixtureError> {
    let mut seed_bytes = [0u8; 32];
    for (i, byte) in seed_bytes.iter_mut().enumerate() {
        *byte = seed.wrapping_mul(i as u8 + 1).wrapping_add(i as u8);
    }

    let mut pkcs8 = PKCS8_V1_ED25519_PREFIX.to_vec();
    pkcs8.extend_from_slice(&seed_bytes);

    Ed25519KeyPair::from_pkcs8_maybe_unchecked(&pkcs8)
        .map_err(|e| FixtureError::Crypto(format!("Failed to build test keypair: {:?}", e)))?;

    Ok(pkcs8)
}

/// Base64 form of [`test_signing_key`], as `AUTH_SIGNING_KEY` expects it.
pub fn test_signing_key_base64(seed: u8) -> Result<String, FixtureError> {
    Ok(general_purpose::STANDARD.encode(test_signing_key(seed)?))
}

/// Configuration for an in-memory service with the cheapest allowed bcrypt cost.
pub fn test_config() -> Result<Config, FixtureError> {
    Ok(Config {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        bind_address: "127.0.0.1:0".to_string(),
        signing_key: SecretBox::new(Box::new(test_signing_key(1)?)),
        bcrypt_cost: MIN_BCRYPT_COST,
        access_token_lifetime_seconds: DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS,
        refresh_token_lifetime_seconds: DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS,
        jwt_clock_skew_seconds: DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        teacher_email_domain: DEFAULT_TEACHER_EMAIL_DOMAIN.to_string(),
    })
}
