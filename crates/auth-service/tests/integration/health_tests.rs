//! Integration tests for operational endpoints and key publication

use auth_service::models::Jwks;
use auth_test_utils::server_harness::TestAuthServer;
use chrono::Utc;
use common::jwt::{self, TokenType, DEFAULT_CLOCK_SKEW};
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_endpoint() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    // Never leaks natural keys or tokens, whatever else it contains
    let body = response.text().await?;
    assert!(!body.contains("12345678"));
    Ok(())
}

#[tokio::test]
async fn test_published_key_verifies_issued_tokens() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let pair = server.register_and_login_student("12345678", "p1").await?;

    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("max-age=3600")
    );

    let jwks: Jwks = response.json().await?;
    let key = jwks.keys.first().expect("one published key");
    assert_eq!(key.kid, server.kid());
    assert_eq!(key.crv, "Ed25519");

    let public_key = jwt::decode_ed25519_public_key_jwk(&key.x)?;
    let claims = jwt::verify_token(
        &pair.access,
        &public_key,
        TokenType::Access,
        DEFAULT_CLOCK_SKEW,
        Utc::now().timestamp(),
    )?;
    assert_eq!(claims.token_type, TokenType::Access);

    Ok(())
}

#[tokio::test]
async fn test_unknown_path_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/v1/users", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
