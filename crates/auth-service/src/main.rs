use auth_service::config::Config;
use auth_service::handlers::auth_handler::AppState;
use auth_service::repositories::refresh_tokens;
use auth_service::{crypto, db, routes};
use base64::{engine::general_purpose, Engine};
use chrono::Utc;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `campus-auth generate-key` prints a fresh AUTH_SIGNING_KEY value
    if std::env::args().nth(1).as_deref() == Some("generate-key") {
        let pkcs8 = crypto::generate_signing_key()?;
        println!("{}", general_purpose::STANDARD.encode(pkcs8));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Campus Auth");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    // Initialize database connection pool
    info!("Connecting to database...");
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState::new(pool.clone(), config).map_err(|e| {
        error!("Failed to initialize application state: {}", e);
        e
    })?);
    info!(kid = %state.issuer.kid(), "Signing key loaded");

    let metrics_handle = routes::init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    tokio::spawn(purge_expired_tokens(pool));

    // Build application routes
    let app = routes::build_routes(state, metrics_handle);

    info!("Campus Auth listening on {}", addr);

    // Start server with ConnectInfo support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically drop refresh bookkeeping for tokens past their expiry.
async fn purge_expired_tokens(pool: SqlitePool) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        match refresh_tokens::purge_expired(&pool, Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Purged expired refresh tokens"),
            Err(e) => warn!(error = %e, "Failed to purge expired refresh tokens"),
        }
    }
}
