//! JWT claims and offline verification shared by the issuer and resource servers.
//!
//! Tokens are EdDSA (Ed25519) JWTs carrying a [`TokenClaims`] payload. Any
//! service holding the issuer's public key (published as a JWK set) can verify
//! them without calling back to the auth service.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only EdDSA is accepted
//! - Expiry is checked against an explicit `now` with no leeway
//! - `iat` more than the clock skew tolerance in the future is rejected
//! - Every failure surfaces as the same generic message; the specific cause is
//!   logged at debug level only
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{verify_token, TokenType, DEFAULT_CLOCK_SKEW};
//!
//! let der = decode_ed25519_public_key_jwk(&jwk.x)?;
//! let now = chrono::Utc::now().timestamp();
//! let claims = verify_token(token, &der, TokenType::Access, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use crate::types::PrincipalKind;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Checked before base64 decoding or signature verification so oversized
/// tokens are rejected with minimal work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default tolerance for `iat` timestamps in the future (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound on the configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Generic message for every token rejection.
pub const INVALID_TOKEN_MESSAGE: &str = "Token is invalid or expired";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during JWT validation.
///
/// All variants display the same message to avoid leaking which check failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a structurally valid JWT.
    #[error("Token is invalid or expired")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("Token is invalid or expired")]
    MissingKid,

    /// Signature does not verify against the supplied key.
    #[error("Token is invalid or expired")]
    InvalidSignature,

    /// `exp` is at or before the verification time.
    #[error("Token is invalid or expired")]
    Expired,

    /// An access token was presented where a refresh token was expected, or
    /// the reverse.
    #[error("Token is invalid or expired")]
    WrongTokenType,

    /// Token `iat` claim is too far in the future.
    #[error("Token is invalid or expired")]
    IatTooFarInFuture,
}

impl JwtValidationError {
    /// Bounded label for metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            JwtValidationError::TokenTooLarge => "too_large",
            JwtValidationError::MalformedToken => "malformed",
            JwtValidationError::MissingKid => "missing_kid",
            JwtValidationError::InvalidSignature => "invalid_signature",
            JwtValidationError::Expired => "expired",
            JwtValidationError::WrongTokenType => "wrong_token_type",
            JwtValidationError::IatTooFarInFuture => "clock_skew",
        }
    }
}

// =============================================================================
// Claims Types
// =============================================================================

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims carried by both access and refresh tokens.
///
/// `sub` and `jti` identify a principal and a single token respectively, so
/// both are redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Access or refresh.
    pub token_type: TokenType,

    /// Subject (principal UUID).
    pub sub: String,

    /// Principal kind the subject belongs to.
    pub kind: PrincipalKind,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Unique token identifier, used for refresh token blacklisting.
    pub jti: String,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("token_type", &self.token_type)
            .field("sub", &"[REDACTED]")
            .field("kind", &self.kind)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The returned value is only good for key lookup; the token must still be
/// verified with the matching key.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64 or invalid JSON header
/// - `MissingKid` - Header has no non-empty string `kid`
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Validate the `iat` claim against an explicit `now`.
///
/// # Errors
///
/// Returns `IatTooFarInFuture` if `iat` is more than `clock_skew` after `now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds)
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Validate the `exp` claim against an explicit `now`.
///
/// A token is expired from the second named by `exp` onward.
///
/// # Errors
///
/// Returns `Expired` if `now >= exp`.
pub fn validate_exp_at(exp: i64, now: i64) -> Result<(), JwtValidationError> {
    if now >= exp {
        tracing::debug!(target: "common.jwt", exp = exp, now = now, "Token rejected: expired");
        return Err(JwtValidationError::Expired);
    }
    Ok(())
}

/// Verify a token's signature and claims at time `now`.
///
/// # Arguments
///
/// * `token` - The compact JWT
/// * `public_key_der` - Raw Ed25519 public key bytes
/// * `expected` - The token type the caller accepts
/// * `clock_skew` - Tolerance for `iat` in the future
/// * `now` - Verification time (Unix epoch seconds)
///
/// # Errors
///
/// Any [`JwtValidationError`]; all display the same generic message.
pub fn verify_token(
    token: &str,
    public_key_der: &[u8],
    expected: TokenType,
    clock_skew: Duration,
    now: i64,
) -> Result<TokenClaims, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let decoding_key = DecodingKey::from_ed_der(public_key_der);

    // Expiry is checked below against the caller's clock, without leeway
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_exp = false;
    validation.leeway = 0;

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                JwtValidationError::InvalidSignature
            }
            _ => JwtValidationError::MalformedToken,
        }
    })?;
    let claims = token_data.claims;

    if claims.token_type != expected {
        tracing::debug!(
            target: "common.jwt",
            expected = expected.as_str(),
            actual = claims.token_type.as_str(),
            "Token rejected: wrong token type"
        );
        return Err(JwtValidationError::WrongTokenType);
    }

    validate_exp_at(claims.exp, now)?;
    validate_iat_at(claims.iat, clock_skew, now)?;

    Ok(claims)
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not valid base64url.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================
