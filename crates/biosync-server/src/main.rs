//! Biosync Server - Main entry point

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use biosync_common::logging::{init_logging, LogConfig};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use biosync_server::{
    config::Config,
    db, features, middleware,
    scheduler::SyncScheduler,
    sync::{DatabaseRegistry, SyncEngine, SyncSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::default()
        .with_file_prefix("biosync-server")
        .with_filter("biosync_server=debug,tower_http=debug,sqlx=info");

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Biosync Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize destination database connection pool
    let db_pool = db::create_pool(&config.database).await?;
    info!("Destination database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Load source database registry and build the sync engine
    let registry = DatabaseRegistry::load(config.sync.registry_file.as_deref());
    info!(databases = ?registry.ids(), "Source database registry ready");

    let engine = Arc::new(SyncEngine::new(
        db_pool.clone(),
        registry,
        SyncSettings::from(&config.sync),
    ));

    // Start the background scheduler if enabled
    let _scheduler_handle = if config.sync.schedule_enabled {
        info!("Sync scheduling is enabled, starting scheduler");
        Some(SyncScheduler::new(engine.clone(), &config.sync).start())
    } else {
        info!("Sync scheduling is disabled (SYNC_SCHEDULE_ENABLED=false)");
        None
    };

    // Create application state
    let state = features::FeatureState {
        db: db_pool,
        engine,
    };

    // Build the application router
    let app = create_router(state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: features::FeatureState, config: &Config) -> Router {
    let feature_routes = features::router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .nest("/api/v1", feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(state): State<features::FeatureState>) -> impl IntoResponse {
    // Check destination database connectivity
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unreachable"
                })),
            )
                .into_response()
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give ongoing requests time to complete
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
