use crate::errors::AuthError;
use crate::models::{AuthEvent, AuthEventType, PrincipalRef, RequestContext};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Log an authentication event
pub async fn log_event(
    pool: &SqlitePool,
    event_type: AuthEventType,
    principal: Option<PrincipalRef>,
    success: bool,
    failure_reason: Option<&str>,
    context: &RequestContext,
) -> Result<AuthEvent, AuthError> {
    let event = AuthEvent {
        event_id: Uuid::new_v4(),
        event_type: event_type.as_str().to_string(),
        principal_kind: principal.map(|p| p.kind.as_str().to_string()),
        principal_id: principal.map(|p| p.id),
        success,
        failure_reason: failure_reason.map(str::to_string),
        ip_address: context.ip_address.clone(),
        user_agent: context.user_agent.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO auth_events (
            event_id, event_type, principal_kind, principal_id, success,
            failure_reason, ip_address, user_agent, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(event.event_id)
    .bind(&event.event_type)
    .bind(&event.principal_kind)
    .bind(event.principal_id)
    .bind(event.success)
    .bind(&event.failure_reason)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .bind(event.created_at)
    .execute(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to log auth event: {}", e)))?;

    Ok(event)
}

/// Get authentication events for a principal, newest first
pub async fn get_events_by_principal(
    pool: &SqlitePool,
    principal: PrincipalRef,
    limit: i64,
) -> Result<Vec<AuthEvent>, AuthError> {
    sqlx::query_as::<_, AuthEvent>(
        r#"
        SELECT
            event_id, event_type, principal_kind, principal_id, success,
            failure_reason, ip_address, user_agent, created_at
        FROM auth_events
        WHERE principal_kind = ?1 AND principal_id = ?2
        ORDER BY created_at DESC
        LIMIT ?3
        "#,
    )
    .bind(principal.kind.as_str())
    .bind(principal.id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to fetch principal events: {}", e)))
}

/// Get events of one type, newest first
pub async fn get_events_by_type(
    pool: &SqlitePool,
    event_type: AuthEventType,
    limit: i64,
) -> Result<Vec<AuthEvent>, AuthError> {
    sqlx::query_as::<_, AuthEvent>(
        r#"
        SELECT
            event_id, event_type, principal_kind, principal_id, success,
            failure_reason, ip_address, user_agent, created_at
        FROM auth_events
        WHERE event_type = ?1
        ORDER BY created_at DESC
        LIMIT ?2
        "#,
    )
    .bind(event_type.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to fetch events by type: {}", e)))
}
