use crate::crypto::PasswordHasher;
use crate::errors::{AuthError, FieldErrors};
use crate::models::{AuthEventType, Credentials, Principal, RequestContext, TokenPair};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_login;
use crate::repositories::{students, teachers};
use crate::services::registration_service::normalize_email;
use crate::services::token_service::TokenIssuer;
use crate::services::{audit, required};
use common::secret::ExposeSecret;
use common::types::PrincipalKind;
use sqlx::SqlitePool;
use std::time::Instant;
use tracing::instrument;

/// Authenticate a principal by natural key and password and issue a token pair.
///
/// # Security
///
/// - An unknown key still costs one bcrypt verification (against the dummy
///   digest), so timing does not reveal which keys exist
/// - Unknown key and wrong password fail with the same `InvalidCredentials`
/// - Failed attempts are logged without a principal reference
#[instrument(skip_all, fields(kind = %credentials.kind))]
pub async fn login(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    issuer: &TokenIssuer,
    credentials: Credentials,
    context: &RequestContext,
) -> Result<TokenPair, AuthError> {
    let start = Instant::now();
    let kind = credentials.kind;
    let result = authenticate_and_issue(pool, hasher, issuer, &credentials, context).await;
    record_login(kind, result.is_ok(), start.elapsed());
    result
}

async fn authenticate_and_issue(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    issuer: &TokenIssuer,
    credentials: &Credentials,
    context: &RequestContext,
) -> Result<TokenPair, AuthError> {
    let kind = credentials.kind;

    let mut errors = FieldErrors::new();
    let natural_key = required(
        &mut errors,
        kind.natural_key_field(),
        credentials.natural_key.as_deref(),
    );
    let password = required(
        &mut errors,
        "password",
        credentials.password.as_ref().map(|p| p.expose_secret()),
    );
    let (natural_key, password) = match (natural_key, password) {
        (Some(key), Some(password)) if errors.is_empty() => (key.trim(), password),
        _ => return Err(AuthError::Validation(errors)),
    };

    let principal = find_by_natural_key(pool, kind, natural_key).await?;
    let matched = hasher.verify_or_dummy(password, principal.as_ref().map(Principal::password_hash))?;

    let principal = match principal {
        Some(principal) if matched => principal,
        _ => {
            tracing::info!(
                target: "auth.login",
                kind = %kind,
                key = %hash_for_correlation(natural_key),
                "Login failed"
            );
            audit(
                pool,
                AuthEventType::LoginFailed,
                None,
                false,
                Some("invalid_credentials"),
                context,
            )
            .await;
            return Err(AuthError::InvalidCredentials(kind));
        }
    };

    let subject = principal.subject();
    let pair = issuer.issue(pool, subject).await?;

    tracing::info!(
        target: "auth.login",
        kind = %kind,
        key = %hash_for_correlation(natural_key),
        "Login succeeded"
    );
    audit(pool, AuthEventType::LoginSucceeded, Some(subject), true, None, context).await;

    Ok(pair)
}

/// Look up a principal by the field it logs in with.
pub async fn find_by_natural_key(
    pool: &SqlitePool,
    kind: PrincipalKind,
    natural_key: &str,
) -> Result<Option<Principal>, AuthError> {
    match kind {
        PrincipalKind::Student => Ok(students::get_by_varsity_id(pool, natural_key)
            .await?
            .map(Principal::Student)),
        PrincipalKind::Teacher => Ok(teachers::get_by_email(pool, &normalize_email(natural_key))
            .await?
            .map(Principal::Teacher)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::MIN_BCRYPT_COST;
    use crate::crypto::{self, SigningKeys};
    use crate::db;
    use crate::models::{RegistrationRequest, StudentRegistration, TeacherRegistration};
    use crate::repositories::auth_events;
    use crate::services::registration_service::register;
    use crate::services::REQUIRED_MESSAGE;
    use chrono::Utc;
    use common::jwt::{TokenType, DEFAULT_CLOCK_SKEW};
    use common::secret::SecretString;

    const SUFFIX: &str = "@physics.cu.ac.bd";

    struct Fixture {
        pool: SqlitePool,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
    }

    impl Fixture {
        async fn new() -> Self {
            let keys = SigningKeys::from_pkcs8(&crypto::generate_signing_key().unwrap()).unwrap();
            Self {
                pool: db::connect("sqlite::memory:", 1).await.unwrap(),
                hasher: PasswordHasher::new(MIN_BCRYPT_COST).unwrap(),
                issuer: TokenIssuer::new(keys, 1800, 432_000, DEFAULT_CLOCK_SKEW),
            }
        }

        async fn register(&self, request: RegistrationRequest) -> Principal {
            register(
                &self.pool,
                &self.hasher,
                SUFFIX,
                request,
                &RequestContext::default(),
            )
            .await
            .unwrap()
        }

        async fn login(&self, credentials: Credentials) -> Result<TokenPair, AuthError> {
            login(
                &self.pool,
                &self.hasher,
                &self.issuer,
                credentials,
                &RequestContext::default(),
            )
            .await
        }
    }

    fn example_student() -> RegistrationRequest {
        RegistrationRequest::Student(StudentRegistration {
            full_name: Some("A".to_string()),
            varsity_id: Some("12345678".to_string()),
            email: Some("a@x.com".to_string()),
            password: Some(SecretString::from("p1")),
        })
    }

    fn student_login(varsity_id: &str, password: &str) -> Credentials {
        Credentials {
            kind: PrincipalKind::Student,
            natural_key: Some(varsity_id.to_string()),
            password: Some(SecretString::from(password)),
        }
    }

    fn teacher_login(email: &str, password: &str) -> Credentials {
        Credentials {
            kind: PrincipalKind::Teacher,
            natural_key: Some(email.to_string()),
            password: Some(SecretString::from(password)),
        }
    }

    #[tokio::test]
    async fn test_register_then_login_returns_live_access_token() {
        let f = Fixture::new().await;
        let principal = f.register(example_student()).await;

        let pair = f.login(student_login("12345678", "p1")).await.unwrap();
        let claims = f.issuer.verify(&pair.access, TokenType::Access).unwrap();

        assert_eq!(claims.sub, principal.id().to_string());
        assert_eq!(claims.kind, PrincipalKind::Student);
        assert!(claims.exp > Utc::now().timestamp());
        assert!(f.issuer.verify(&pair.refresh, TokenType::Refresh).is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_key_are_indistinguishable() {
        let f = Fixture::new().await;
        f.register(example_student()).await;

        let wrong = f.login(student_login("12345678", "wrong")).await.unwrap_err();
        let unknown = f.login(student_login("87654321", "p1")).await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials(PrincipalKind::Student)));
        assert!(matches!(unknown, AuthError::InvalidCredentials(PrincipalKind::Student)));
        assert_eq!(wrong.to_string(), "Invalid Varsity ID or password");
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_password_matching_only_first_72_bytes_is_rejected() {
        let f = Fixture::new().await;
        let password = "a".repeat(crypto::MAX_PASSWORD_BYTES);
        f.register(RegistrationRequest::Student(StudentRegistration {
            full_name: Some("A".to_string()),
            varsity_id: Some("12345678".to_string()),
            email: Some("a@x.com".to_string()),
            password: Some(SecretString::from(password.as_str())),
        }))
        .await;

        let err = f
            .login(student_login("12345678", &format!("{}totally-different", password)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(PrincipalKind::Student)));

        let err = f
            .login(student_login("87654321", &format!("{}x", password)))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(PrincipalKind::Student)));

        assert!(f.login(student_login("12345678", &password)).await.is_ok());
    }

    #[tokio::test]
    async fn test_teacher_login() {
        let f = Fixture::new().await;
        f.register(RegistrationRequest::Teacher(TeacherRegistration {
            full_name: Some("Dr. T".to_string()),
            email: Some("t@physics.cu.ac.bd".to_string()),
            password: Some(SecretString::from("secret")),
        }))
        .await;

        let pair = f.login(teacher_login("t@PHYSICS.cu.ac.bd", "secret")).await.unwrap();
        let claims = f.issuer.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(claims.kind, PrincipalKind::Teacher);

        let err = f.login(teacher_login("t@physics.cu.ac.bd", "nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_student_credentials_do_not_work_for_teacher_login() {
        let f = Fixture::new().await;
        f.register(example_student()).await;

        let err = f.login(teacher_login("a@x.com", "p1")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(PrincipalKind::Teacher)));
    }

    #[tokio::test]
    async fn test_missing_fields_are_validation_errors() {
        let f = Fixture::new().await;

        let err = f
            .login(Credentials {
                kind: PrincipalKind::Student,
                natural_key: None,
                password: None,
            })
            .await
            .unwrap_err();

        match err {
            AuthError::Validation(errors) => {
                assert_eq!(
                    errors.get("varsity_id"),
                    Some(&[REQUIRED_MESSAGE.to_string()][..])
                );
                assert!(errors.contains("password"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_events_do_not_reveal_key_existence() {
        let f = Fixture::new().await;
        let principal = f.register(example_student()).await;

        f.login(student_login("12345678", "wrong")).await.unwrap_err();
        f.login(student_login("87654321", "wrong")).await.unwrap_err();
        f.login(student_login("12345678", "p1")).await.unwrap();

        let failures = auth_events::get_events_by_type(&f.pool, AuthEventType::LoginFailed, 10)
            .await
            .unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|e| e.principal_id.is_none()));
        assert!(failures
            .iter()
            .all(|e| e.failure_reason.as_deref() == Some("invalid_credentials")));

        let events = auth_events::get_events_by_principal(&f.pool, principal.subject(), 10)
            .await
            .unwrap();
        assert!(events.iter().any(|e| e.event_type == "login_succeeded"));
    }
}
