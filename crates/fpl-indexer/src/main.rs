//! FPL Indexer Server
//!
//! An async Rust server that indexes Fantasy Premier League gameweek data
//! into a search backend in small, resumable chunks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fpl_indexer::{
    client::{FplClient, SearchClient},
    config::{AppConfig, DatabaseConfig, StoreBackend},
    db::create_pool,
    handlers,
    services::{FplBootstrapOracle, FplStandingsLookup, GameweekIndexer},
    state::AppState,
    store::{ExecutionStore, InMemoryExecutionStore, PgExecutionStore},
};

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fpl_indexer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the application router with all routes.
fn build_router(state: AppState) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    handlers::routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Open the configured execution store.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ExecutionStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::info!(
                retention_secs = config.execution_retention_secs,
                "Using in-memory execution store"
            );
            Ok(Arc::new(InMemoryExecutionStore::new(Duration::from_secs(
                config.execution_retention_secs,
            ))))
        }
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load database config, using defaults");
                DatabaseConfig::default()
            });
            let pool = create_pool(&db_config).await?;
            tracing::info!(host = %db_config.host, database = %db_config.database, "Using PostgreSQL execution store");
            Ok(Arc::new(PgExecutionStore::connect(pool).await?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting FPL Indexer"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        store = ?app_config.store,
        fpl_api_url = %app_config.fpl_api_url,
        search_url = %app_config.search_url,
        "Configuration loaded"
    );

    let store = open_store(&app_config).await?;

    let timeout = Duration::from_secs(app_config.request_timeout_secs);
    let fpl = FplClient::new(&app_config.fpl_api_url, timeout);
    let search = SearchClient::new(&app_config.search_url, &app_config.search_index, timeout);

    let oracle = Arc::new(FplBootstrapOracle::new(
        fpl.clone(),
        Duration::from_secs(app_config.bootstrap_ttl_secs),
    ));
    let standings = Arc::new(FplStandingsLookup::new(
        fpl.clone(),
        app_config.standings_max_pages,
    ));
    let indexer = Arc::new(GameweekIndexer::new(fpl, search));

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let state = AppState::new(store, oracle, standings, indexer, app_config);
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
