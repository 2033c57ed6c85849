//! Student repository.

use super::map_insert_error;
use crate::errors::AuthError;
use crate::models::Student;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub const VARSITY_ID_CONFLICT: &str = "student with this varsity id already exists.";
pub const EMAIL_CONFLICT: &str = "student with this email already exists.";

/// Get a student by varsity ID (the student natural key).
pub async fn get_by_varsity_id(
    pool: &SqlitePool,
    varsity_id: &str,
) -> Result<Option<Student>, AuthError> {
    sqlx::query_as::<_, Student>(
        r#"
        SELECT student_id, full_name, varsity_id, email, password_hash, created_at
        FROM students
        WHERE varsity_id = ?1
        "#,
    )
    .bind(varsity_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| AuthError::Database(format!("Failed to fetch student by varsity id: {}", e)))
}

/// Check if a varsity ID is already registered.
pub async fn varsity_id_exists(pool: &SqlitePool, varsity_id: &str) -> Result<bool, AuthError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM students WHERE varsity_id = ?1)")
            .bind(varsity_id)
            .fetch_one(pool)
            .await
            .map_err(|e| AuthError::Database(format!("Failed to check varsity id: {}", e)))?;

    Ok(exists)
}

/// Check if an email is already used by a student.
pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, AuthError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM students WHERE email = ?1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(|e| AuthError::Database(format!("Failed to check student email: {}", e)))?;

    Ok(exists)
}

/// Insert a new student.
///
/// The UNIQUE constraints on `varsity_id` and `email` are the final word on
/// uniqueness: a violation comes back as `AuthError::Conflict`.
pub async fn create_student(
    pool: &SqlitePool,
    full_name: &str,
    varsity_id: &str,
    email: &str,
    password_hash: &str,
) -> Result<Student, AuthError> {
    let student = Student {
        student_id: Uuid::new_v4(),
        full_name: full_name.to_string(),
        varsity_id: varsity_id.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO students (student_id, full_name, varsity_id, email, password_hash, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(student.student_id)
    .bind(&student.full_name)
    .bind(&student.varsity_id)
    .bind(&student.email)
    .bind(&student.password_hash)
    .bind(student.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        map_insert_error(
            e,
            "students",
            &[
                ("varsity_id", VARSITY_ID_CONFLICT),
                ("email", EMAIL_CONFLICT),
            ],
        )
    })?;

    Ok(student)
}
