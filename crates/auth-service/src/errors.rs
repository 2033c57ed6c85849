use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::INVALID_TOKEN_MESSAGE;
use common::types::PrincipalKind;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-field validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when no field failed, otherwise a `Validation` error.
    pub fn into_result(self) -> Result<(), AuthError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Conflict on {field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    /// Deliberately identical for unknown natural keys and wrong passwords.
    #[error("Invalid {} or password", .0.natural_key_label())]
    InvalidCredentials(PrincipalKind),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// The body could not be read as JSON at all. Carries the status the
    /// body extractor chose (400, 413 or 415).
    #[error("Malformed request body: {detail}")]
    MalformedBody { status: StatusCode, detail: String },
}

impl AuthError {
    /// Bounded label for metrics and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::Conflict { .. } => "conflict",
            AuthError::InvalidCredentials(_) => "invalid_credentials",
            AuthError::InvalidToken(_) => "token_not_valid",
            AuthError::Database(_) => "database_error",
            AuthError::Crypto(_) => "crypto_error",
            AuthError::MalformedBody { .. } => "parse_error",
        }
    }
}

#[derive(Serialize)]
struct DetailResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.code();
        match self {
            AuthError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AuthError::Conflict { field, message } => {
                let mut errors = FieldErrors::new();
                errors.add(field, message);
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            AuthError::InvalidCredentials(_) => (
                StatusCode::UNAUTHORIZED,
                Json(DetailResponse {
                    detail: self.to_string(),
                    code: None,
                }),
            )
                .into_response(),
            AuthError::InvalidToken(reason) => {
                tracing::debug!(reason = %reason, "Rejecting token");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(DetailResponse {
                        detail: INVALID_TOKEN_MESSAGE.to_string(),
                        code: Some(code),
                    }),
                )
                    .into_response()
            }
            AuthError::MalformedBody { status, detail } => (
                status,
                Json(DetailResponse { detail, code: None }),
            )
                .into_response(),
            AuthError::Database(_) | AuthError::Crypto(_) => {
                tracing::error!(error = %self, "Request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(DetailResponse {
                        detail: "An internal error occurred".to_string(),
                        code: Some(code),
                    }),
                )
                    .into_response()
            }
        }
    }
}
