use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use footfall::analytics::StatsEngine;
use footfall::api;
use footfall::clock::{Clock, SystemClock};
use footfall::config::{Config, DatabaseBackend, TrustedProxyMode};
use footfall::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("footfall=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::with_clock(
                    &config.database.url,
                    config.database.max_connections,
                    Arc::clone(&clock),
                )
                .await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorage::with_clock(
                    &config.database.url,
                    config.database.max_connections,
                    Arc::clone(&clock),
                )
                .await?,
            )
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let engine = Arc::new(StatsEngine::new(
        Arc::clone(&storage),
        clock,
        &config.stats,
    ));
    info!(
        cache_ttl_secs = config.stats.cache_ttl_secs,
        page_size = config.stats.page_size,
        dedup_window_secs = config.stats.dedup_window_secs,
        "Stats engine ready"
    );

    if config.visitor.trusted_proxy_mode == TrustedProxyMode::None {
        info!("Client IPs taken from the socket address only");
    }

    let router = api::create_api_router(engine, config.visitor.clone(), &config.cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - POST http://{}/api/visit", addr);
    info!("   - GET  http://{}/api/stats", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
