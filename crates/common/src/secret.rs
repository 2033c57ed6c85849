//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for passwords and key material.
//! `SecretString` and `SecretBox<T>` implement `Debug` with redaction, so a
//! request struct that derives `Debug` stays safe to log, and the inner value
//! is zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginRequest {
//!     varsity_id: String,
//!     password: SecretString,
//! }
//!
//! let req = LoginRequest {
//!     varsity_id: "12345678".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{req:?}").contains("hunter2"));
//! let password: &str = req.password.expose_secret();
//! assert_eq!(password, "hunter2");
//! ```
//!
//! Use `SecretString` for plaintext passwords and `SecretBox<Vec<u8>>` for
//! binary key material such as the token signing key.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
