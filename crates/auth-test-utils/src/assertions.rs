//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for issued tokens. They inspect the token
//! without verifying its signature; use the service's issuer for that.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::{TokenClaims, TokenType};
use common::types::PrincipalKind;
use serde_json::Value;

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

fn header(token: &str) -> Value {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header JSON")
}

/// Decode the claims of a token without checking its signature.
pub fn decode_claims(token: &str) -> TokenClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims JSON")
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// pair.access
///     .assert_valid_jwt()
///     .assert_token_type(TokenType::Access)
///     .assert_for_kind(PrincipalKind::Student)
///     .assert_expires_in(1800);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a well-formed EdDSA JWT with our claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the access/refresh discriminator
    fn assert_token_type(&self, expected: TokenType) -> &Self;

    /// Assert the principal kind carried in the token
    fn assert_for_kind(&self, kind: PrincipalKind) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that the token was signed by the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that `exp - iat` equals the given lifetime
    fn assert_expires_in(&self, seconds: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header = header(self);
        assert_eq!(header["alg"], "EdDSA", "Expected EdDSA algorithm");
        assert_eq!(header["typ"], "JWT", "Expected JWT type");
        assert!(header["kid"].is_string(), "Expected a kid in the header");

        decode_claims(self);
        self
    }

    fn assert_token_type(&self, expected: TokenType) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(
            claims.token_type, expected,
            "Unexpected token type {:?}",
            claims.token_type
        );
        self
    }

    fn assert_for_kind(&self, kind: PrincipalKind) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(claims.kind, kind, "Token issued for {:?}", claims.kind);
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(claims.sub, subject, "Token subject mismatch");
        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header["kid"].as_str(),
            Some(key_id),
            "Token signed by unexpected key"
        );
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Token lifetime is {}s",
            claims.exp - claims.iat
        );
        self
    }
}
