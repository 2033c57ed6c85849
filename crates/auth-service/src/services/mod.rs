pub mod login_service;
pub mod registration_service;
pub mod token_service;

use crate::errors::FieldErrors;
use crate::models::{AuthEventType, PrincipalRef, RequestContext};
use crate::observability::metrics::record_audit_log_failure;
use crate::repositories::auth_events;
use sqlx::SqlitePool;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const BLANK_MESSAGE: &str = "This field may not be blank.";

/// Pull a required string field out of a request body.
///
/// Records "required" for a missing field and "blank" for one that is empty
/// after trimming, returning `None` in both cases.
pub(crate) fn required<'a>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value {
        None => {
            errors.add(field, REQUIRED_MESSAGE);
            None
        }
        Some(v) if v.trim().is_empty() => {
            errors.add(field, BLANK_MESSAGE);
            None
        }
        Some(v) => Some(v),
    }
}

/// Write an auth event. A failed write is logged and counted but never fails
/// the request it describes.
pub(crate) async fn audit(
    pool: &SqlitePool,
    event_type: AuthEventType,
    principal: Option<PrincipalRef>,
    success: bool,
    failure_reason: Option<&str>,
    context: &RequestContext,
) {
    if let Err(e) =
        auth_events::log_event(pool, event_type, principal, success, failure_reason, context).await
    {
        tracing::warn!(
            target: "auth.audit",
            event_type = event_type.as_str(),
            error = %e,
            "Failed to log auth event"
        );
        record_audit_log_failure(event_type.as_str());
    }
}
