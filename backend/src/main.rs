//! Gym console inventory ledger - backend server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use gym_stock_backend::{config::Config, create_app, services::PgLedgerStore, AppState};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stock_server=debug,gym_stock_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting gym inventory server");
    tracing::info!("Environment: {}", config.environment);

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    let store = PgLedgerStore::new(db_pool, config.inventory.lock_timeout_ms);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let state = AppState::new(Arc::new(store), config)?;

    // Rebuild cached stock from the ledger before serving
    let reports = state.ledger().reconcile_all().await?;
    let corrected = reports.iter().filter(|r| r.corrected).count();
    if corrected > 0 {
        tracing::warn!(corrected, "Cached stock repaired at startup");
    }

    let app = create_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
