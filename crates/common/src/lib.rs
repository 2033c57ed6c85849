//! Types and token utilities shared by the Campus Auth service and the
//! resource servers that verify its tokens.

#![warn(clippy::pedantic)]

/// Module for principal identity types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT claims and offline token verification
pub mod jwt;
