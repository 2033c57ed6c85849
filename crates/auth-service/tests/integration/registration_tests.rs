//! Integration tests for student and teacher registration

use auth_service::repositories::{auth_events, students};
use auth_service::models::AuthEventType;
use auth_test_utils::server_harness::TestAuthServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_student_registration_returns_profile_without_password() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/student/", server.url()))
        .json(&json!({
            "full_name": "A",
            "varsity_id": "12345678",
            "email": "a@x.com",
            "password": "p1"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["full_name"], "A");
    assert_eq!(body["varsity_id"], "12345678");
    assert_eq!(body["email"], "a@x.com");
    assert!(body["id"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    // Stored as a bcrypt digest, never the plaintext
    let stored = students::get_by_varsity_id(server.pool(), "12345678")
        .await?
        .expect("student should exist");
    assert!(stored.password_hash.starts_with("$2"));
    assert_ne!(stored.password_hash, "p1");

    Ok(())
}

#[tokio::test]
async fn test_teacher_registration_requires_department_domain() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/teacher/", server.url()))
        .json(&json!({"full_name": "T", "email": "t@gmail.com", "password": "p"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"email": ["Email must end with @physics.cu.ac.bd"]}));

    let response = client
        .post(format!("{}/register/teacher", server.url()))
        .json(&json!({
            "full_name": "Dr. T",
            "email": "t@physics.cu.ac.bd",
            "password": "p"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await?;
    assert_eq!(body["email"], "t@physics.cu.ac.bd");
    assert!(body.get("varsity_id").is_none());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_varsity_id_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/register/student/", server.url());

    let first = client
        .post(&url)
        .json(&json!({
            "full_name": "A",
            "varsity_id": "12345678",
            "email": "a@x.com",
            "password": "p1"
        }))
        .send()
        .await?;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(&url)
        .json(&json!({
            "full_name": "B",
            "varsity_id": "12345678",
            "email": "b@x.com",
            "password": "p2"
        }))
        .send()
        .await?;

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = second.json().await?;
    assert_eq!(
        body["varsity_id"][0],
        "student with this varsity id already exists."
    );

    Ok(())
}

#[tokio::test]
async fn test_missing_and_oversized_fields_reported_per_field() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/student/", server.url()))
        .json(&json!({"full_name": "", "varsity_id": "123456789", "email": "nope"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["full_name"][0], "This field may not be blank.");
    assert_eq!(
        body["varsity_id"][0],
        "Ensure this field has no more than 8 characters."
    );
    assert_eq!(body["email"][0], "Enter a valid email address.");
    assert_eq!(body["password"][0], "This field is required.");

    Ok(())
}

#[tokio::test]
async fn test_registration_is_audited_with_peer_address() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/student/", server.url()))
        .header("User-Agent", "integration-test/1.0")
        .json(&json!({
            "full_name": "A",
            "varsity_id": "1",
            "email": "a@x.com",
            "password": "p1"
        }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let events =
        auth_events::get_events_by_type(server.pool(), AuthEventType::StudentRegistered, 10)
            .await?;
    assert_eq!(events.len(), 1);
    let event = events.first().expect("one event");
    assert!(event.success);
    assert_eq!(event.ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(event.user_agent.as_deref(), Some("integration-test/1.0"));

    Ok(())
}

#[tokio::test]
async fn test_numeric_varsity_id_is_field_error() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/register/student/", server.url()))
        .json(&json!({
            "full_name": "A",
            "varsity_id": 12345678,
            "email": "a@x.com",
            "password": "p1"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"varsity_id": ["Not a valid string."]}));

    assert!(students::get_by_varsity_id(server.pool(), "12345678")
        .await?
        .is_none());

    Ok(())
}

#[tokio::test]
async fn test_unparseable_body_is_bad_request() -> Result<(), anyhow::Error> {
    let server = TestAuthServer::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/register/teacher/", server.url()))
        .header("Content-Type", "application/json")
        .body(r#"{"full_name": "T", "email": "#)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert!(body["detail"].is_string());

    Ok(())
}
