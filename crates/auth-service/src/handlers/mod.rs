pub mod auth_handler;
pub mod health_handler;
pub mod jwks_handler;
pub mod request_body;
