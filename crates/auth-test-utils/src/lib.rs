//! # Auth Test Utilities
//!
//! Shared test utilities for the Campus Auth service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed signing keys for reproducible tests)
//! - Server test harness (`TestAuthServer` for E2E tests)
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestAuthServer::spawn().await?;
//!     let pair = server.register_and_login_student("12345678", "p1").await?;
//!
//!     pair.access
//!         .assert_valid_jwt()
//!         .assert_token_type(TokenType::Access)
//!         .assert_signed_by(&server.kid());
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
