use base64::{engine::general_purpose, Engine as _};
use common::secret::{ExposeSecret, SecretBox};
use ring::signature::Ed25519KeyPair;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Bcrypt cost bounds. Below 10 is too cheap to resist offline cracking,
/// above 14 pushes login latency past a second.
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

pub const DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS: i64 = 30 * 60;
pub const DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS: i64 = 5 * 24 * 60 * 60;
/// Upper bound for either token lifetime (one year).
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 365 * 24 * 60 * 60;

pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: i64 = 300;
pub const MAX_JWT_CLOCK_SKEW_SECONDS: i64 = 600;

pub const DEFAULT_TEACHER_EMAIL_DOMAIN: &str = "physics.cu.ac.bd";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    /// PKCS#8-encoded Ed25519 private key used to sign every token.
    pub signing_key: SecretBox<Vec<u8>>,
    pub bcrypt_cost: u32,
    pub access_token_lifetime_seconds: i64,
    pub refresh_token_lifetime_seconds: i64,
    pub jwt_clock_skew_seconds: i64,
    /// Domain every teacher email must belong to, without the leading `@`.
    pub teacher_email_domain: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("bind_address", &self.bind_address)
            .field("signing_key", &"[REDACTED]")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field(
                "access_token_lifetime_seconds",
                &self.access_token_lifetime_seconds,
            )
            .field(
                "refresh_token_lifetime_seconds",
                &self.refresh_token_lifetime_seconds,
            )
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("teacher_email_domain", &self.teacher_email_domain)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let database_max_connections = parse_or_default(
            vars,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;
        if database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", "must be at least 1"));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let signing_key_base64 = vars
            .get("AUTH_SIGNING_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_SIGNING_KEY".to_string()))?;

        let signing_key = general_purpose::STANDARD
            .decode(signing_key_base64.trim())
            .map_err(ConfigError::Base64Error)?;

        Ed25519KeyPair::from_pkcs8_maybe_unchecked(&signing_key).map_err(|e| {
            ConfigError::InvalidSigningKey(format!("Expected PKCS#8 Ed25519 key: {}", e))
        })?;

        let bcrypt_cost = parse_or_default(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(invalid(
                "BCRYPT_COST",
                &format!(
                    "{} is outside {}-{}",
                    bcrypt_cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
                ),
            ));
        }

        let access_token_lifetime_seconds = parse_or_default(
            vars,
            "ACCESS_TOKEN_LIFETIME_SECONDS",
            DEFAULT_ACCESS_TOKEN_LIFETIME_SECONDS,
        )?;
        if access_token_lifetime_seconds <= 0 {
            return Err(invalid(
                "ACCESS_TOKEN_LIFETIME_SECONDS",
                "must be positive",
            ));
        }

        let refresh_token_lifetime_seconds = parse_or_default(
            vars,
            "REFRESH_TOKEN_LIFETIME_SECONDS",
            DEFAULT_REFRESH_TOKEN_LIFETIME_SECONDS,
        )?;
        if refresh_token_lifetime_seconds <= access_token_lifetime_seconds {
            return Err(invalid(
                "REFRESH_TOKEN_LIFETIME_SECONDS",
                "must exceed the access token lifetime",
            ));
        }
        if refresh_token_lifetime_seconds > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(invalid(
                "REFRESH_TOKEN_LIFETIME_SECONDS",
                &format!("must not exceed {}", MAX_TOKEN_LIFETIME_SECONDS),
            ));
        }

        let jwt_clock_skew_seconds = parse_or_default(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_JWT_CLOCK_SKEW_SECONDS,
        )?;
        if !(1..=MAX_JWT_CLOCK_SKEW_SECONDS).contains(&jwt_clock_skew_seconds) {
            return Err(invalid(
                "JWT_CLOCK_SKEW_SECONDS",
                &format!("must be between 1 and {}", MAX_JWT_CLOCK_SKEW_SECONDS),
            ));
        }

        let teacher_email_domain = vars
            .get("TEACHER_EMAIL_DOMAIN")
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_TEACHER_EMAIL_DOMAIN.to_string());
        if teacher_email_domain.is_empty() {
            return Err(invalid("TEACHER_EMAIL_DOMAIN", "must not be empty"));
        }

        Ok(Config {
            database_url,
            database_max_connections,
            bind_address,
            signing_key: SecretBox::new(Box::new(signing_key)),
            bcrypt_cost,
            access_token_lifetime_seconds,
            refresh_token_lifetime_seconds,
            jwt_clock_skew_seconds,
            teacher_email_domain,
        })
    }

    /// Required suffix for teacher emails, including the `@`.
    pub fn teacher_email_suffix(&self) -> String {
        format!("@{}", self.teacher_email_domain)
    }

    /// Raw PKCS#8 signing key bytes.
    pub fn signing_key_pkcs8(&self) -> &[u8] {
        self.signing_key.expose_secret()
    }
}

fn parse_or_default<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
