use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::crypto::generate_random_bytes;
use crate::errors::AuthError;
use crate::observability::metrics::record_bcrypt_duration;
use std::fmt;
use std::time::Instant;
use tracing::instrument;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt password hashing with a fixed cost.
///
/// Passwords longer than [`MAX_PASSWORD_BYTES`] are never hashed and never
/// match, so two passwords sharing a 72-byte prefix cannot stand in for each
/// other.
///
/// Holds a dummy digest made at construction with the same cost, verified in
/// place of a real one when no principal matched, so unknown-key and
/// wrong-password logins take the same time.
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// # Errors
    ///
    /// Returns `AuthError::Crypto` if `cost` is outside 10..=14 or hashing
    /// the dummy digest fails.
    #[instrument(skip_all, fields(cost = cost))]
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::Crypto(format!(
                "Invalid bcrypt cost: {} (must be {}-{})",
                cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        let filler = hex::encode(generate_random_bytes(16)?);
        let dummy_hash = bcrypt::hash(filler, cost)
            .map_err(|e| AuthError::Crypto(format!("Dummy hash generation failed: {}", e)))?;

        Ok(Self { cost, dummy_hash })
    }

    /// Hash a plaintext password with a random salt.
    #[instrument(skip_all)]
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::Crypto(format!(
                "Password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        let start = Instant::now();
        let result = bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::Crypto(format!("Password hashing failed: {}", e)));
        record_bcrypt_duration("hash", start.elapsed());
        result
    }

    /// Verify a plaintext password against a stored digest.
    ///
    /// An over-long password still costs one verification but never matches.
    #[instrument(skip_all)]
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let start = Instant::now();
        let result = bcrypt::verify(password, hash)
            .map(|matched| matched && password.len() <= MAX_PASSWORD_BYTES)
            .map_err(|e| AuthError::Crypto(format!("Password verification failed: {}", e)));
        record_bcrypt_duration("verify", start.elapsed());
        result
    }

    /// Verify against `hash` when a principal was found, otherwise burn the
    /// same work on the dummy digest and report a mismatch.
    #[instrument(skip_all)]
    pub fn verify_or_dummy(&self, password: &str, hash: Option<&str>) -> Result<bool, AuthError> {
        match hash {
            Some(hash) => self.verify(password, hash),
            None => {
                let start = Instant::now();
                let _ = bcrypt::verify(password, &self.dummy_hash);
                record_bcrypt_duration("verify_dummy", start.elapsed());
                Ok(false)
            }
        }
    }
}
