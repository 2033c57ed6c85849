//! Integration tests for student and teacher login

use auth_test_utils::assertions::TokenAssertions;
use auth_test_utils::server_harness::TestAuthServer;
use common::jwt::TokenType;
use common::types::PrincipalKind;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_student_login_issues_pair() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let pair = server.register_and_login_student("12345678", "p1").await?;

    pair.access
        .assert_valid_jwt()
        .assert_token_type(TokenType::Access)
        .assert_for_kind(PrincipalKind::Student)
        .assert_signed_by(&server.kid())
        .assert_expires_in(30 * 60);
    pair.refresh
        .assert_valid_jwt()
        .assert_token_type(TokenType::Refresh)
        .assert_expires_in(5 * 24 * 60 * 60);

    let claims = server.state().issuer.verify(&pair.access, TokenType::Access)?;
    pair.refresh.assert_for_subject(&claims.sub);

    Ok(())
}

#[tokio::test]
async fn test_wrong_password_and_unknown_id_look_identical() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.register_and_login_student("12345678", "p1").await?;
    let client = reqwest::Client::new();
    let url = format!("{}/login/student/", server.url());

    let wrong_password = client
        .post(&url)
        .json(&json!({"varsity_id": "12345678", "password": "wrong"}))
        .send()
        .await?;
    let unknown_id = client
        .post(&url)
        .json(&json!({"varsity_id": "99999999", "password": "p1"}))
        .send()
        .await?;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_id.status(), StatusCode::UNAUTHORIZED);

    let wrong_password: Value = wrong_password.json().await?;
    let unknown_id: Value = unknown_id.json().await?;
    assert_eq!(wrong_password, json!({"detail": "Invalid Varsity ID or password"}));
    assert_eq!(wrong_password, unknown_id);

    Ok(())
}

#[tokio::test]
async fn test_teacher_login_with_mixed_case_domain() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/teacher/", server.url()))
        .json(&json!({
            "full_name": "Dr. T",
            "email": "t@Physics.CU.ac.bd",
            "password": "secret"
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["email"], "t@physics.cu.ac.bd");

    let response = client
        .post(format!("{}/login/teacher/", server.url()))
        .json(&json!({"email": "t@PHYSICS.CU.AC.BD", "password": "secret"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    body["access"]
        .as_str()
        .expect("access token")
        .to_string()
        .assert_for_kind(PrincipalKind::Teacher);

    let response = client
        .post(format!("{}/login/teacher/", server.url()))
        .json(&json!({"email": "t@physics.cu.ac.bd", "password": "Secret"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"detail": "Invalid email or password"}));

    Ok(())
}

#[tokio::test]
async fn test_password_is_not_trimmed() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    server.register_and_login_student("7", " padded ").await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/login/student/", server.url()))
        .json(&json!({"varsity_id": "7", "password": "padded"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_login_missing_fields_is_bad_request() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/login/student/", server.url()))
        .json(&json!({"varsity_id": "12345678"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"password": ["This field is required."]}));

    Ok(())
}

#[tokio::test]
async fn test_numeric_varsity_id_is_field_error() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/login/student/", server.url()))
        .json(&json!({"varsity_id": 12345678, "password": "p1"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"varsity_id": ["Not a valid string."]}));

    Ok(())
}
