//! Refresh token bookkeeping: every minted refresh token is outstanding until
//! it expires; a refresh token becomes blacklisted the moment it is rotated.

use crate::errors::AuthError;
use crate::models::PrincipalRef;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

/// Record a freshly minted refresh token.
pub async fn record_outstanding<'e, E>(
    executor: E,
    jti: &str,
    principal: PrincipalRef,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<(), AuthError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO outstanding_tokens (jti, principal_kind, principal_id, issued_at, expires_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(jti)
    .bind(principal.kind.as_str())
    .bind(principal.id)
    .bind(issued_at)
    .bind(expires_at)
    .execute(executor)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to record outstanding token: {}", e)))?;

    Ok(())
}

/// Blacklist a refresh token.
///
/// Returns `true` if this call blacklisted it, `false` if it already was.
/// The primary key on `jti` makes this a one-shot transition even under
/// concurrent callers.
pub async fn blacklist<'e, E>(executor: E, jti: &str, now: DateTime<Utc>) -> Result<bool, AuthError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO blacklisted_tokens (jti, blacklisted_at)
        VALUES (?1, ?2)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to blacklist token: {}", e)))?;

    Ok(result.rows_affected() == 1)
}

/// Check if a refresh token has been blacklisted.
pub async fn is_blacklisted(pool: &SqlitePool, jti: &str) -> Result<bool, AuthError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE jti = ?1)")
            .bind(jti)
            .fetch_one(pool)
            .await
            .map_err(|e| AuthError::Database(format!("Failed to check blacklist: {}", e)))?;

    Ok(exists)
}

/// Count outstanding refresh tokens for a principal.
pub async fn count_outstanding(pool: &SqlitePool, principal: PrincipalRef) -> Result<i64, AuthError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM outstanding_tokens WHERE principal_kind = ?1 AND principal_id = ?2",
    )
    .bind(principal.kind.as_str())
    .bind(principal.id)
    .fetch_one(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to count outstanding tokens: {}", e)))?;

    Ok(count)
}

/// Delete bookkeeping for refresh tokens that expired before `now`.
///
/// Expired tokens fail verification on their own, so their blacklist entries
/// no longer protect anything. Returns the number of outstanding rows removed.
pub async fn purge_expired(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, AuthError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AuthError::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query(
        r#"
        DELETE FROM blacklisted_tokens
        WHERE jti IN (SELECT jti FROM outstanding_tokens WHERE expires_at < ?1)
        "#,
    )
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to purge blacklisted tokens: {}", e)))?;

    let result = sqlx::query("DELETE FROM outstanding_tokens WHERE expires_at < ?1")
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to purge outstanding tokens: {}", e)))?;

    tx.commit()
        .await
        .map_err(|e| AuthError::Database(format!("Failed to commit purge: {}", e)))?;

    Ok(result.rows_affected())
}
