//! Integration tests for refresh token rotation

use auth_service::models::{AuthEventType, TokenPair};
use auth_service::repositories::{auth_events, refresh_tokens};
use auth_test_utils::assertions::{decode_claims, TokenAssertions};
use auth_test_utils::server_harness::TestAuthServer;
use common::jwt::TokenType;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn refresh(server: &TestAuthServer, token: &str) -> Result<reqwest::Response, anyhow::Error> {
    Ok(reqwest::Client::new()
        .post(format!("{}/token/refresh/", server.url()))
        .json(&json!({ "refresh": token }))
        .send()
        .await?)
}

#[tokio::test]
async fn test_refresh_rotates_and_blacklists_old_token() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let original = server.register_and_login_student("12345678", "p1").await?;

    let response = refresh(&server, &original.refresh).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated: TokenPair = response.json().await?;

    assert_ne!(rotated.refresh, original.refresh);
    rotated
        .access
        .assert_valid_jwt()
        .assert_token_type(TokenType::Access)
        .assert_for_subject(&decode_claims(&original.access).sub);

    let old_jti = decode_claims(&original.refresh).jti;
    assert!(refresh_tokens::is_blacklisted(server.pool(), &old_jti).await?);

    // Reusing the rotated-out token fails
    let reuse = refresh(&server, &original.refresh).await?;
    assert_eq!(reuse.status(), StatusCode::UNAUTHORIZED);
    let body: Value = reuse.json().await?;
    assert_eq!(
        body,
        json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})
    );

    // The new refresh token still works
    let response = refresh(&server, &rotated.refresh).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_access_token_cannot_refresh() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let pair = server.register_and_login_student("12345678", "p1").await?;

    let response = refresh(&server, &pair.access).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The refresh token is still unused
    let response = refresh(&server, &pair.refresh).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let pair = server.register_and_login_student("12345678", "p1").await?;

    let attempts = futures::future::join_all((0..4).map(|_| refresh(&server, &pair.refresh))).await;

    let mut ok = 0;
    let mut unauthorized = 0;
    for attempt in attempts {
        match attempt?.status() {
            StatusCode::OK => ok += 1,
            StatusCode::UNAUTHORIZED => unauthorized += 1,
            other => anyhow::bail!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(unauthorized, 3);

    Ok(())
}

#[tokio::test]
async fn test_refresh_failures_are_audited() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let missing = reqwest::Client::new()
        .post(format!("{}/token/refresh/", server.url()))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing.json().await?;
    assert_eq!(body, json!({"refresh": ["This field is required."]}));

    let garbage = refresh(&server, "garbage").await?;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let failures =
        auth_events::get_events_by_type(server.pool(), AuthEventType::TokenRefreshFailed, 10)
            .await?;
    assert!(!failures.is_empty());
    assert!(failures.iter().all(|e| !e.success));

    Ok(())
}
