//! Observability for the auth service.
//!
//! # Privacy by Default
//!
//! Service functions use `#[instrument(skip_all)]` and record only allow-listed
//! fields:
//! - **SAFE**: principal kind, event type, error code
//! - **HASHED**: natural keys (varsity ID, email) and principal ids, via
//!   [`hash_for_correlation`]
//! - **NEVER**: passwords, password hashes, tokens, signing keys

pub mod metrics;

use crate::errors::AuthError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// One-way and truncated: good enough to follow a single varsity ID or email
/// across log lines, not enough to recover it.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or conflicting input
    Validation,
    /// Wrong credentials
    Authentication,
    /// Bad, expired or reused tokens
    Cryptographic,
    /// Database and system failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&AuthError> for ErrorCategory {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Validation(_)
            | AuthError::Conflict { .. }
            | AuthError::MalformedBody { .. } => ErrorCategory::Validation,
            AuthError::InvalidCredentials(_) => ErrorCategory::Authentication,
            AuthError::InvalidToken(_) | AuthError::Crypto(_) => ErrorCategory::Cryptographic,
            AuthError::Database(_) => ErrorCategory::Internal,
        }
    }
}
