//! JSON body extraction with field-keyed errors.
//!
//! Every request body of this service is a flat object of optional string
//! fields. A field holding a number, boolean, array or object is reported
//! under its own name with status 400 instead of failing deserialization as
//! a whole.

use crate::errors::{AuthError, FieldErrors};
use crate::models::{
    RefreshRequest, StudentLogin, StudentRegistration, TeacherLogin, TeacherRegistration,
};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const NOT_A_STRING_MESSAGE: &str = "Not a valid string.";
pub const NULL_MESSAGE: &str = "This field may not be null.";
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A request body whose known fields are all strings.
pub trait RequestBody: DeserializeOwned {
    const FIELDS: &'static [&'static str];
}

impl RequestBody for StudentRegistration {
    const FIELDS: &'static [&'static str] = &["full_name", "varsity_id", "email", "password"];
}

impl RequestBody for TeacherRegistration {
    const FIELDS: &'static [&'static str] = &["full_name", "email", "password"];
}

impl RequestBody for StudentLogin {
    const FIELDS: &'static [&'static str] = &["varsity_id", "password"];
}

impl RequestBody for TeacherLogin {
    const FIELDS: &'static [&'static str] = &["email", "password"];
}

impl RequestBody for RefreshRequest {
    const FIELDS: &'static [&'static str] = &["refresh"];
}

/// JSON extractor rejecting with [`AuthError`].
///
/// Content-type and syntax failures keep the status axum assigns them and
/// render as `{"detail": ...}`. Type mismatches in known fields become a
/// `Validation` error keyed by field. Unknown fields are ignored.
#[derive(Debug)]
pub struct AuthJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for AuthJson<T>
where
    T: RequestBody,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(
                    target: "auth.request",
                    status = %rejection.status(),
                    error = %rejection.body_text(),
                    "Rejected request body"
                );
                AuthError::MalformedBody {
                    status: rejection.status(),
                    detail: rejection.body_text(),
                }
            })?;

        let object = match value {
            Value::Object(object) => object,
            other => {
                let mut errors = FieldErrors::new();
                errors.add(
                    NON_FIELD_ERRORS,
                    format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type_name(&other)
                    ),
                );
                return Err(AuthError::Validation(errors));
            }
        };

        check_field_types(&object, T::FIELDS).into_result()?;

        serde_json::from_value(Value::Object(object))
            .map(AuthJson)
            .map_err(|e| AuthError::MalformedBody {
                status: StatusCode::BAD_REQUEST,
                detail: format!("JSON parse error - {}", e),
            })
    }
}

fn check_field_types(object: &Map<String, Value>, fields: &[&'static str]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for &field in fields {
        match object.get(field) {
            None | Some(Value::String(_)) => {}
            Some(Value::Null) => errors.add(field, NULL_MESSAGE),
            Some(_) => errors.add(field, NOT_A_STRING_MESSAGE),
        }
    }
    errors
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
