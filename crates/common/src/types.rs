//! Principal identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The two kinds of principal that can authenticate.
///
/// Each kind has its own natural key: students log in with their varsity ID,
/// teachers with their institutional email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Student,
    Teacher,
}

/// Returned when parsing an unknown principal kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown principal kind: {0}")]
pub struct UnknownPrincipalKind(pub String);

impl PrincipalKind {
    /// Stable lowercase name, used in claims, storage and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalKind::Student => "student",
            PrincipalKind::Teacher => "teacher",
        }
    }

    /// Name of the request field holding the natural key.
    #[must_use]
    pub fn natural_key_field(self) -> &'static str {
        match self {
            PrincipalKind::Student => "varsity_id",
            PrincipalKind::Teacher => "email",
        }
    }

    /// Human-readable natural key name used in login failure messages.
    #[must_use]
    pub fn natural_key_label(self) -> &'static str {
        match self {
            PrincipalKind::Student => "Varsity ID",
            PrincipalKind::Teacher => "email",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = UnknownPrincipalKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(PrincipalKind::Student),
            "teacher" => Ok(PrincipalKind::Teacher),
            other => Err(UnknownPrincipalKind(other.to_string())),
        }
    }
}
