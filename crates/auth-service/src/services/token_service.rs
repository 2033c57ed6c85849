//! Access/refresh token pairs: minting, offline verification and refresh
//! rotation with blacklisting.

use crate::config::Config;
use crate::crypto::{self, SigningKeys};
use crate::errors::{AuthError, FieldErrors};
use crate::models::{AuthEventType, Jwks, PrincipalRef, RefreshRequest, RequestContext, TokenPair};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_token_refresh, record_token_validation};
use crate::repositories::refresh_tokens;
use crate::services::{audit, required};
use chrono::{DateTime, Utc};
use common::jwt::{TokenClaims, TokenType};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Signs and verifies token pairs with the configured key and lifetimes.
#[derive(Debug)]
pub struct TokenIssuer {
    keys: SigningKeys,
    access_lifetime_seconds: i64,
    refresh_lifetime_seconds: i64,
    clock_skew: Duration,
}

/// A freshly minted pair plus the refresh claims that must be recorded.
struct MintedPair {
    pair: TokenPair,
    refresh: TokenClaims,
}

impl TokenIssuer {
    pub fn new(
        keys: SigningKeys,
        access_lifetime_seconds: i64,
        refresh_lifetime_seconds: i64,
        clock_skew: Duration,
    ) -> Self {
        Self {
            keys,
            access_lifetime_seconds,
            refresh_lifetime_seconds,
            clock_skew,
        }
    }

    /// Build from configuration; the signing key was already validated there.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        let keys = SigningKeys::from_pkcs8(config.signing_key_pkcs8())?;
        let clock_skew = u64::try_from(config.jwt_clock_skew_seconds)
            .map(Duration::from_secs)
            .map_err(|_| AuthError::Crypto("Clock skew must not be negative".to_string()))?;

        Ok(Self::new(
            keys,
            config.access_token_lifetime_seconds,
            config.refresh_token_lifetime_seconds,
            clock_skew,
        ))
    }

    /// Key ID stamped into every issued token.
    pub fn kid(&self) -> &str {
        self.keys.kid()
    }

    pub fn jwks(&self) -> Jwks {
        self.keys.jwks()
    }

    fn mint_at(&self, subject: PrincipalRef, now: i64) -> Result<MintedPair, AuthError> {
        let claims = |token_type, lifetime: i64| -> Result<TokenClaims, AuthError> {
            let exp = now.checked_add(lifetime).ok_or_else(|| {
                AuthError::Crypto(format!("Token expiry overflows for lifetime {}s", lifetime))
            })?;
            Ok(TokenClaims {
                token_type,
                sub: subject.id.to_string(),
                kind: subject.kind,
                iat: now,
                exp,
                jti: crypto::generate_jti(),
            })
        };
        let access = claims(TokenType::Access, self.access_lifetime_seconds)?;
        let refresh = claims(TokenType::Refresh, self.refresh_lifetime_seconds)?;

        let pair = TokenPair {
            access: self.keys.sign(&access)?,
            refresh: self.keys.sign(&refresh)?,
        };
        Ok(MintedPair { pair, refresh })
    }

    /// Issue a new pair for `subject` and record the refresh token as outstanding.
    pub async fn issue(&self, pool: &SqlitePool, subject: PrincipalRef) -> Result<TokenPair, AuthError> {
        self.issue_at(pool, subject, Utc::now().timestamp()).await
    }

    #[instrument(skip_all, fields(kind = %subject.kind))]
    pub async fn issue_at(
        &self,
        pool: &SqlitePool,
        subject: PrincipalRef,
        now: i64,
    ) -> Result<TokenPair, AuthError> {
        let minted = self.mint_at(subject, now)?;
        refresh_tokens::record_outstanding(
            pool,
            &minted.refresh.jti,
            subject,
            timestamp(minted.refresh.iat)?,
            timestamp(minted.refresh.exp)?,
        )
        .await?;

        Ok(minted.pair)
    }

    /// Verify a token of the expected type at the current time.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, expected, Utc::now().timestamp())
    }

    /// Verify a token of the expected type at time `now`.
    ///
    /// The specific failure is kept as the error's reason for logs; clients
    /// only ever see the generic token message.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenType,
        now: i64,
    ) -> Result<TokenClaims, AuthError> {
        match self.keys.verify(token, expected, self.clock_skew, now) {
            Ok(claims) => {
                record_token_validation("success", None);
                Ok(claims)
            }
            Err(e) => {
                record_token_validation("error", Some(e.reason()));
                Err(AuthError::InvalidToken(e.reason().to_string()))
            }
        }
    }

    /// Rotate a refresh token at the current time.
    pub async fn refresh(&self, pool: &SqlitePool, token: &str) -> Result<(TokenPair, PrincipalRef), AuthError> {
        self.refresh_at(pool, token, Utc::now().timestamp()).await
    }

    /// Rotate a refresh token at time `now`.
    ///
    /// The old `jti` is blacklisted and the new refresh token recorded in one
    /// transaction whose first statement is the blacklist insert, so at most
    /// one caller can ever rotate a given token.
    #[instrument(skip_all)]
    pub async fn refresh_at(
        &self,
        pool: &SqlitePool,
        token: &str,
        now: i64,
    ) -> Result<(TokenPair, PrincipalRef), AuthError> {
        let claims = self.verify_at(token, TokenType::Refresh, now)?;
        let subject = PrincipalRef {
            id: Uuid::parse_str(&claims.sub)
                .map_err(|_| AuthError::InvalidToken("malformed_subject".to_string()))?,
            kind: claims.kind,
        };

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AuthError::Database(format!("Failed to begin transaction: {}", e)))?;

        if !refresh_tokens::blacklist(&mut *tx, &claims.jti, timestamp(now)?).await? {
            tracing::debug!(target: "auth.token", "Refresh token already rotated");
            return Err(AuthError::InvalidToken("blacklisted".to_string()));
        }

        let minted = self.mint_at(subject, now)?;
        refresh_tokens::record_outstanding(
            &mut *tx,
            &minted.refresh.jti,
            subject,
            timestamp(minted.refresh.iat)?,
            timestamp(minted.refresh.exp)?,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Database(format!("Failed to commit refresh: {}", e)))?;

        Ok((minted.pair, subject))
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::Crypto(format!("Timestamp out of range: {}", secs)))
}

/// Handle a refresh request body: validate it, rotate the token and record
/// the outcome.
#[instrument(skip_all)]
pub async fn refresh_pair(
    pool: &SqlitePool,
    issuer: &TokenIssuer,
    request: RefreshRequest,
    context: &RequestContext,
) -> Result<TokenPair, AuthError> {
    let mut errors = FieldErrors::new();
    let token = required(&mut errors, "refresh", request.refresh.as_deref());
    let token = match token {
        Some(token) if errors.is_empty() => token,
        _ => return Err(AuthError::Validation(errors)),
    };

    let result = issuer.refresh(pool, token).await;
    record_token_refresh(result.is_ok());

    match result {
        Ok((pair, subject)) => {
            tracing::info!(
                target: "auth.token",
                kind = %subject.kind,
                principal = %hash_for_correlation(&subject.id.to_string()),
                "Refresh token rotated"
            );
            audit(
                pool,
                AuthEventType::TokenRefreshed,
                Some(subject),
                true,
                None,
                context,
            )
            .await;
            Ok(pair)
        }
        Err(e) => {
            audit(
                pool,
                AuthEventType::TokenRefreshFailed,
                None,
                false,
                Some(e.code()),
                context,
            )
            .await;
            Err(e)
        }
    }
}
