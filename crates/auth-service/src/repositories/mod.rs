//! Database access layer.
//!
//! Free async functions over `&SqlitePool` (or any SQLite executor when they
//! must run inside a caller's transaction), mapping `sqlx::Error` into
//! `AuthError`.

pub mod auth_events;
pub mod refresh_tokens;
pub mod students;
pub mod teachers;

use crate::errors::AuthError;

/// Map an INSERT failure, turning a UNIQUE violation on one of `fields` into
/// a `Conflict` on that field.
///
/// SQLite reports the violating columns as `table.column` in the message.
pub(crate) fn map_insert_error(
    e: sqlx::Error,
    table: &str,
    fields: &[(&'static str, &str)],
) -> AuthError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            for (field, conflict_message) in fields {
                if message.contains(&format!("{}.{}", table, field)) {
                    return AuthError::Conflict {
                        field,
                        message: (*conflict_message).to_string(),
                    };
                }
            }
        }
    }
    AuthError::Database(format!("Failed to insert into {}: {}", table, e))
}
