//! Teacher repository.

use super::map_insert_error;
use crate::errors::AuthError;
use crate::models::Teacher;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const EMAIL_CONFLICT: &str = "teacher with this email already exists.";

/// Get a teacher by email (the teacher natural key).
pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Teacher>, AuthError> {
    sqlx::query_as::<_, Teacher>(
        r#"
        SELECT teacher_id, full_name, email, password_hash, created_at
        FROM teachers
        WHERE email = ?1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to fetch teacher by email: {}", e)))
}

/// Check if an email is already registered to a teacher.
pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, AuthError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM teachers WHERE email = ?1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to check teacher email: {}", e)))?;

    Ok(exists)
}

/// Insert a new teacher. A UNIQUE violation on `email` becomes `Conflict`.
pub async fn create_teacher(
    pool: &SqlitePool,
    full_name: &str,
    email: &str,
    password_hash: &str,
) -> Result<Teacher, AuthError> {
    let teacher = Teacher {
        teacher_id: Uuid::new_v4(),
        full_name: full_name.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO teachers (teacher_id, full_name, email, password_hash, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(teacher.teacher_id)
    .bind(&teacher.full_name)
    .bind(&teacher.email)
    .bind(&teacher.password_hash)
    .bind(teacher.created_at)
    .execute(pool)
    .await
    .map_err(|e| map_insert_error(e, "teachers", &[("email", EMAIL_CONFLICT)]))?;

    Ok(teacher)
}
