//! Subrent Backend Service
//!
//! Main entry point for the equipment sub-rental marketplace backend.
//! Serves the JSON API, the platform admin API and the Stripe webhook.

use std::net::SocketAddr;
use std::sync::Arc;
use subrent_backend::database::{create_pool, run_migrations};
use subrent_backend::{router, AppConfig, AppError, AppResult, AppState};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "subrent_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, shutting down gracefully...");
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Subrent Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    if config.stripe_webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET not set - webhook deliveries will be rejected");
    }
    if config.auth.platform_admin_emails.is_empty() {
        warn!("PLATFORM_ADMIN_EMAILS not set - /admin routes are unreachable");
    }

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let http_port = config.http_port;
    let environment = config.environment.clone();
    let state = Arc::new(AppState::new(pool, config).map_err(|e| {
        error!("Failed to initialize application state: {}", e);
        e
    })?);
    info!("✓ Application state initialized");
    info!("✓ Audit trail writing to {:?}", state.audit.log_directory());
    info!("✓ Mail outbox at {:?}", state.config.mail.outbox_dir);

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           Subrent Backend Service Ready!                 ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     {}", addr);
    info!("║  Environment:  {}", environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Message(format!("HTTP server error: {}", e)))?;

    info!("Subrent backend service shutdown complete");
    Ok(())
}
