/// Token Service Main Entry Point
///
/// Starts the HTTP API with:
/// - PostgreSQL connection pool (token records + security audit log)
/// - Signed token codec (process-wide secret)
/// - Issuance, validation, and revocation services
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use token_service::config::Settings;
use token_service::db::{PgAuditSink, PgTokenStore};
use token_service::http::{start_http_server, AppState};
use token_service::security::TokenCodec;
use token_service::services::{
    RevocationManager, SecurityAuditLog, TokenIssuer, TokenValidator,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "token_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Token Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .min_connections(settings.database.min_connections)
        .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // Wire the service objects once; request handlers share them by
    // handle. The store is the only shared mutable resource.
    let store = Arc::new(PgTokenStore::new(db_pool.clone()));
    let audit = Arc::new(SecurityAuditLog::new(Arc::new(PgAuditSink::new(db_pool))));
    let codec = Arc::new(TokenCodec::new(&settings.token.signing_secret));

    let state = AppState {
        issuer: Arc::new(TokenIssuer::new(
            store.clone(),
            codec.clone(),
            audit.clone(),
        )),
        validator: Arc::new(TokenValidator::new(store.clone(), codec, audit.clone())),
        revocation: Arc::new(RevocationManager::new(store, audit)),
        internal_api_key: settings.token.internal_api_key.clone(),
    };

    start_http_server(state, &settings.server.host, settings.server.port).await
}
