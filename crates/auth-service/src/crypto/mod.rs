//! Token signing keys and password hashing.

mod password;

pub use password::{PasswordHasher, MAX_PASSWORD_BYTES};

use crate::errors::AuthError;
use crate::models::{JsonWebKey, Jwks};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::jwt::{self, JwtValidationError, TokenClaims, TokenType};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::{
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair},
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// The process-wide Ed25519 signing key and its published public half.
///
/// Loaded once at startup from configuration. Replacing the key invalidates
/// every outstanding token.
pub struct SigningKeys {
    encoding_key: EncodingKey,
    public_key: Vec<u8>,
    kid: String,
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("encoding_key", &"[REDACTED]")
            .field("kid", &self.kid)
            .finish()
    }
}

impl SigningKeys {
    /// Load from a PKCS#8 encoded Ed25519 private key.
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self, AuthError> {
        let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(pkcs8)
            .map_err(|e| AuthError::Crypto(format!("Invalid private key format: {}", e)))?;
        let public_key = key_pair.public_key().as_ref().to_vec();

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(pkcs8),
            kid: key_id_for(&public_key),
            public_key,
        })
    }

    /// Key ID carried in every token header and in the JWK.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign claims as an EdDSA JWT with this key's `kid`.
    #[instrument(skip_all)]
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("JWT signing operation failed: {}", e)))
    }

    /// Verify a token signed by this key at time `now`.
    ///
    /// A token whose `kid` names a different key is rejected without
    /// attempting signature verification.
    #[instrument(skip_all)]
    pub fn verify(
        &self,
        token: &str,
        expected: TokenType,
        clock_skew: Duration,
        now: i64,
    ) -> Result<TokenClaims, JwtValidationError> {
        let kid = jwt::extract_kid(token)?;
        if kid != self.kid {
            tracing::debug!(target: "auth.crypto", "Token rejected: unknown kid");
            return Err(JwtValidationError::InvalidSignature);
        }

        jwt::verify_token(token, &self.public_key, expected, clock_skew, now)
    }

    /// The verification key as a JWK set (RFC 7517).
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![JsonWebKey {
                kid: self.kid.clone(),
                kty: "OKP".to_string(),
                crv: "Ed25519".to_string(),
                x: URL_SAFE_NO_PAD.encode(&self.public_key),
                use_: "sig".to_string(),
                alg: "EdDSA".to_string(),
            }],
        }
    }
}

/// Stable key ID: first 8 bytes of SHA-256 over the public key, hex encoded.
fn key_id_for(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    format!("ed25519-{}", hex::encode(digest.get(..8).unwrap_or_default()))
}

/// Generate a fresh Ed25519 private key in PKCS#8 form.
#[instrument(skip_all)]
pub fn generate_signing_key() -> Result<Vec<u8>, AuthError> {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| AuthError::Crypto(format!("Keypair generation failed: {}", e)))?;
    Ok(pkcs8.as_ref().to_vec())
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, AuthError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| AuthError::Crypto(format!("Random bytes generation failed: {}", e)))?;
    Ok(bytes)
}

/// Unique token identifier.
pub fn generate_jti() -> String {
    Uuid::new_v4().to_string()
}
