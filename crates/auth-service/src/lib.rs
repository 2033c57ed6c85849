//! Campus Auth Service Library
//!
//! Registration, login and token rotation for the students and teachers of
//! the department portal.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Token signing keys and bcrypt password hashing
//! - `db` - SQLite pool and embedded migrations
//! - `errors` - Error types and their HTTP rendering
//! - `handlers` - HTTP request handlers
//! - `models` - Data models and request bodies
//! - `observability` - Log correlation and Prometheus metrics
//! - `repositories` - Database access layer
//! - `routes` - Router assembly
//! - `services` - Business logic layer

pub mod config;
pub mod crypto;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
