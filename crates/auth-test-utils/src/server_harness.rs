//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real Campus Auth instances in tests.

use crate::crypto_fixtures::test_config;
use auth_service::config::Config;
use auth_service::db;
use auth_service::handlers::auth_handler::AppState;
use auth_service::models::TokenPair;
use auth_service::routes;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::json;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the auth server in E2E tests
///
/// Each instance owns a private in-memory database.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> Result<()> {
///     let server = TestAuthServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .post(format!("{}/login/student/", server.url()))
///         .json(&serde_json::json!({"varsity_id": "12345678", "password": "p1"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 401);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(test_config()?).await
    }

    /// Spawn a server with a caller-supplied configuration.
    ///
    /// The server binds to a random port on 127.0.0.1 and serves with
    /// connect info so audit events carry the peer address.
    pub async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let pool = db::connect(&config.database_url, config.database_max_connections)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open test database: {}", e))?;

        let state = Arc::new(
            AppState::new(pool, config)
                .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?,
        );

        // The global recorder can only be installed once per process; later
        // servers get a standalone recorder.
        let metrics_handle = match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => PrometheusBuilder::new().build_recorder().handle(),
        };

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }

    /// Shared application state, for reaching the issuer or hasher directly.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Key ID the server stamps into its tokens.
    pub fn kid(&self) -> String {
        self.state.issuer.kid().to_string()
    }

    /// Register a student over HTTP and log in, returning the issued pair.
    pub async fn register_and_login_student(
        &self,
        varsity_id: &str,
        password: &str,
    ) -> Result<TokenPair, anyhow::Error> {
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/register/student/", self.url()))
            .json(&json!({
                "full_name": "Test Student",
                "varsity_id": varsity_id,
                "email": format!("{}@students.example.com", varsity_id),
                "password": password,
            }))
            .send()
            .await?;
        anyhow::ensure!(
            response.status() == reqwest::StatusCode::CREATED,
            "student registration failed: {}",
            response.status()
        );

        let response = client
            .post(format!("{}/login/student/", self.url()))
            .json(&json!({"varsity_id": varsity_id, "password": password}))
            .send()
            .await?;
        anyhow::ensure!(
            response.status() == reqwest::StatusCode::OK,
            "student login failed: {}",
            response.status()
        );

        Ok(response.json::<TokenPair>().await?)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
