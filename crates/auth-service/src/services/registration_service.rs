//! Student and teacher self-registration.
//!
//! # Steps
//!
//! 1. Validate every field, collecting all errors
//! 2. Pre-check natural key (and student email) uniqueness
//! 3. Hash the password
//! 4. Insert; the storage UNIQUE constraints settle any race with a `Conflict`
//! 5. Log a registration event

use crate::crypto::{PasswordHasher, MAX_PASSWORD_BYTES};
use crate::errors::{AuthError, FieldErrors};
use crate::models::{
    AuthEventType, Principal, RegistrationRequest, RequestContext, StudentRegistration,
    TeacherRegistration,
};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_registration;
use crate::repositories::{students, teachers};
use crate::services::{audit, required};
use common::secret::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use tracing::instrument;

const MAX_FULL_NAME_LENGTH: usize = 255;
const MAX_VARSITY_ID_LENGTH: usize = 8;
const MAX_EMAIL_LENGTH: usize = 254;

pub const INVALID_EMAIL_MESSAGE: &str = "Enter a valid email address.";

/// A registration that passed validation, borrowing from the request.
enum NewPrincipal<'a> {
    Student {
        full_name: &'a str,
        varsity_id: &'a str,
        email: String,
        password: &'a str,
    },
    Teacher {
        full_name: &'a str,
        email: String,
        password: &'a str,
    },
}

/// Register a student or teacher.
///
/// `teacher_email_suffix` is the institutional suffix (e.g.
/// `@physics.cu.ac.bd`) every teacher email must end with.
#[instrument(skip_all, fields(kind = %request.kind()))]
pub async fn register(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    teacher_email_suffix: &str,
    request: RegistrationRequest,
    context: &RequestContext,
) -> Result<Principal, AuthError> {
    let kind = request.kind();
    let result = register_validated(pool, hasher, teacher_email_suffix, &request, context).await;
    record_registration(kind, result.is_ok());

    if let Err(e) = &result {
        tracing::debug!(target: "auth.registration", kind = %kind, error = e.code(), "Registration rejected");
    }
    result
}

async fn register_validated(
    pool: &SqlitePool,
    hasher: &PasswordHasher,
    teacher_email_suffix: &str,
    request: &RegistrationRequest,
    context: &RequestContext,
) -> Result<Principal, AuthError> {
    let principal = match validate(request, teacher_email_suffix)? {
        NewPrincipal::Student {
            full_name,
            varsity_id,
            email,
            password,
        } => {
            if students::varsity_id_exists(pool, varsity_id).await? {
                return Err(conflict("varsity_id", students::VARSITY_ID_CONFLICT));
            }
            if students::email_exists(pool, &email).await? {
                return Err(conflict("email", students::EMAIL_CONFLICT));
            }

            let password_hash = hasher.hash(password)?;
            let student =
                students::create_student(pool, full_name, varsity_id, &email, &password_hash)
                    .await?;
            Principal::Student(student)
        }
        NewPrincipal::Teacher {
            full_name,
            email,
            password,
        } => {
            if teachers::email_exists(pool, &email).await? {
                return Err(conflict("email", teachers::EMAIL_CONFLICT));
            }

            let password_hash = hasher.hash(password)?;
            let teacher = teachers::create_teacher(pool, full_name, &email, &password_hash).await?;
            Principal::Teacher(teacher)
        }
    };

    tracing::info!(
        target: "auth.registration",
        kind = %principal.kind(),
        key = %hash_for_correlation(principal.natural_key()),
        "Principal registered"
    );

    audit(
        pool,
        AuthEventType::registered(principal.kind()),
        Some(principal.subject()),
        true,
        None,
        context,
    )
    .await;

    Ok(principal)
}

fn conflict(field: &'static str, message: &str) -> AuthError {
    AuthError::Conflict {
        field,
        message: message.to_string(),
    }
}

fn validate<'a>(
    request: &'a RegistrationRequest,
    teacher_email_suffix: &str,
) -> Result<NewPrincipal<'a>, AuthError> {
    let mut errors = FieldErrors::new();

    let validated = match request {
        RegistrationRequest::Student(StudentRegistration {
            full_name,
            varsity_id,
            email,
            password,
        }) => {
            let full_name = bounded(&mut errors, "full_name", full_name.as_deref(), MAX_FULL_NAME_LENGTH);
            let varsity_id = bounded(&mut errors, "varsity_id", varsity_id.as_deref(), MAX_VARSITY_ID_LENGTH);
            let email = email_field(&mut errors, email.as_deref(), None);
            let password = password_field(&mut errors, password.as_ref());

            match (full_name, varsity_id, email, password) {
                (Some(full_name), Some(varsity_id), Some(email), Some(password)) => {
                    Some(NewPrincipal::Student {
                        full_name,
                        varsity_id,
                        email,
                        password,
                    })
                }
                _ => None,
            }
        }
        RegistrationRequest::Teacher(TeacherRegistration {
            full_name,
            email,
            password,
        }) => {
            let full_name = bounded(&mut errors, "full_name", full_name.as_deref(), MAX_FULL_NAME_LENGTH);
            let email = email_field(&mut errors, email.as_deref(), Some(teacher_email_suffix));
            let password = password_field(&mut errors, password.as_ref());

            match (full_name, email, password) {
                (Some(full_name), Some(email), Some(password)) => Some(NewPrincipal::Teacher {
                    full_name,
                    email,
                    password,
                }),
                _ => None,
            }
        }
    };

    match validated {
        Some(principal) if errors.is_empty() => Ok(principal),
        _ => Err(AuthError::Validation(errors)),
    }
}

/// Required, trimmed, at most `max` characters.
fn bounded<'a>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<&'a str>,
    max: usize,
) -> Option<&'a str> {
    let value = required(errors, field, value)?.trim();
    if value.chars().count() > max {
        errors.add(field, max_length_message(max));
        return None;
    }
    Some(value)
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Validate and normalize an email, optionally requiring a suffix.
fn email_field(
    errors: &mut FieldErrors,
    value: Option<&str>,
    required_suffix: Option<&str>,
) -> Option<String> {
    let value = bounded(errors, "email", value, MAX_EMAIL_LENGTH)?;
    if !is_valid_email(value) {
        errors.add("email", INVALID_EMAIL_MESSAGE);
        return None;
    }

    let email = normalize_email(value);
    if let Some(suffix) = required_suffix {
        if !email.ends_with(suffix) {
            errors.add("email", format!("Email must end with {}", suffix));
            return None;
        }
    }
    Some(email)
}

/// Passwords are checked for presence and encoded length but never trimmed.
fn password_field<'a>(
    errors: &mut FieldErrors,
    value: Option<&'a SecretString>,
) -> Option<&'a str> {
    let password = required(errors, "password", value.map(|p| p.expose_secret()))?;
    if password.len() > MAX_PASSWORD_BYTES {
        errors.add("password", password_too_long_message());
        return None;
    }
    Some(password)
}

fn password_too_long_message() -> String {
    format!("Ensure this field has no more than {} bytes.", MAX_PASSWORD_BYTES)
}

/// Simple email validation.
///
/// Requires exactly one `@` with a non-empty local part, and a domain of at
/// least two non-empty dot-separated labels. No whitespace anywhere.
pub(crate) fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    if local.is_empty() {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    domain_parts.len() >= 2 && domain_parts.iter().all(|p| !p.is_empty())
}

/// Lowercase the domain part of an email, leaving the local part as typed.
pub(crate) fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}
