use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::PrincipalKind;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Student model (maps to students table)
#[derive(Clone, FromRow)]
pub struct Student {
    pub student_id: Uuid,
    pub full_name: String,
    pub varsity_id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Teacher model (maps to teachers table)
#[derive(Clone, FromRow)]
pub struct Teacher {
    pub teacher_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Student")
            .field("student_id", &self.student_id)
            .field("full_name", &self.full_name)
            .field("varsity_id", &self.varsity_id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl fmt::Debug for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teacher")
            .field("teacher_id", &self.teacher_id)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// An authenticated identity: either a student or a teacher.
#[derive(Debug, Clone)]
pub enum Principal {
    Student(Student),
    Teacher(Teacher),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Student(s) => s.student_id,
            Principal::Teacher(t) => t.teacher_id,
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Student(_) => PrincipalKind::Student,
            Principal::Teacher(_) => PrincipalKind::Teacher,
        }
    }

    /// The value the principal logs in with.
    pub fn natural_key(&self) -> &str {
        match self {
            Principal::Student(s) => &s.varsity_id,
            Principal::Teacher(t) => &t.email,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Principal::Student(s) => &s.password_hash,
            Principal::Teacher(t) => &t.password_hash,
        }
    }

    pub fn subject(&self) -> PrincipalRef {
        PrincipalRef {
            id: self.id(),
            kind: self.kind(),
        }
    }
}

/// The identity a token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipalRef {
    pub id: Uuid,
    pub kind: PrincipalKind,
}

/// Principal as returned to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrincipalResponse {
    Student {
        id: Uuid,
        full_name: String,
        varsity_id: String,
        email: String,
    },
    Teacher {
        id: Uuid,
        full_name: String,
        email: String,
    },
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        match principal {
            Principal::Student(s) => PrincipalResponse::Student {
                id: s.student_id,
                full_name: s.full_name.clone(),
                varsity_id: s.varsity_id.clone(),
                email: s.email.clone(),
            },
            Principal::Teacher(t) => PrincipalResponse::Teacher {
                id: t.teacher_id,
                full_name: t.full_name.clone(),
                email: t.email.clone(),
            },
        }
    }
}

/// Student registration body.
///
/// Fields are optional so that missing and blank values can be reported
/// per field instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct StudentRegistration {
    pub full_name: Option<String>,
    pub varsity_id: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Teacher registration body.
#[derive(Debug, Default, Deserialize)]
pub struct TeacherRegistration {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Registration request for either principal kind.
#[derive(Debug)]
pub enum RegistrationRequest {
    Student(StudentRegistration),
    Teacher(TeacherRegistration),
}

impl RegistrationRequest {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            RegistrationRequest::Student(_) => PrincipalKind::Student,
            RegistrationRequest::Teacher(_) => PrincipalKind::Teacher,
        }
    }
}

/// Student login body.
#[derive(Debug, Default, Deserialize)]
pub struct StudentLogin {
    pub varsity_id: Option<String>,
    pub password: Option<SecretString>,
}

/// Teacher login body.
#[derive(Debug, Default, Deserialize)]
pub struct TeacherLogin {
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Login credentials for a specific principal kind.
#[derive(Debug)]
pub struct Credentials {
    pub kind: PrincipalKind,
    pub natural_key: Option<String>,
    pub password: Option<SecretString>,
}

impl From<StudentLogin> for Credentials {
    fn from(login: StudentLogin) -> Self {
        Credentials {
            kind: PrincipalKind::Student,
            natural_key: login.varsity_id,
            password: login.password,
        }
    }
}

impl From<TeacherLogin> for Credentials {
    fn from(login: TeacherLogin) -> Self {
        Credentials {
            kind: PrincipalKind::Teacher,
            natural_key: login.email,
            password: login.password,
        }
    }
}

/// Refresh request body.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Access/refresh token pair returned by login and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("refresh", &"[REDACTED]")
            .field("access", &"[REDACTED]")
            .finish()
    }
}

/// Auth event types recorded in the audit trail (maps to auth_events.event_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventType {
    StudentRegistered,
    TeacherRegistered,
    LoginSucceeded,
    LoginFailed,
    TokenRefreshed,
    TokenRefreshFailed,
}

impl AuthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventType::StudentRegistered => "student_registered",
            AuthEventType::TeacherRegistered => "teacher_registered",
            AuthEventType::LoginSucceeded => "login_succeeded",
            AuthEventType::LoginFailed => "login_failed",
            AuthEventType::TokenRefreshed => "token_refreshed",
            AuthEventType::TokenRefreshFailed => "token_refresh_failed",
        }
    }

    pub fn registered(kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Student => AuthEventType::StudentRegistered,
            PrincipalKind::Teacher => AuthEventType::TeacherRegistered,
        }
    }
}

/// Auth event model (maps to auth_events table)
#[derive(Debug, Clone, FromRow)]
pub struct AuthEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub principal_kind: Option<String>,
    pub principal_id: Option<Uuid>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request metadata recorded alongside auth events.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// JWKS response (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

/// JSON Web Key (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kid: String, // Key ID
    pub kty: String, // Key Type ("OKP" for EdDSA)
    pub crv: String, // Curve ("Ed25519")
    pub x: String,   // Public key (base64url encoded)
    #[serde(rename = "use")]
    pub use_: String, // Public key use ("sig")
    pub alg: String, // Algorithm ("EdDSA")
}
