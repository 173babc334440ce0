//! Gym console inventory ledger
//!
//! Product catalog, append-only stock movement ledger and low-stock alerts,
//! served over a JSON API.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::AlertThresholds;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use crate::error::{AppError, AppResult};
use crate::services::{
    AlertService, LedgerStore, MovementLedger, MovementService, ProductLocks, ProductService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub locks: ProductLocks,
    pub thresholds: AlertThresholds,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, config: Config) -> AppResult<Self> {
        let thresholds = config
            .inventory
            .alert_thresholds()
            .map_err(|msg| AppError::Configuration(msg.to_string()))?;
        Ok(Self {
            store,
            locks: ProductLocks::new(config.inventory.lock_timeout()),
            thresholds,
            config: Arc::new(config),
        })
    }

    pub fn ledger(&self) -> MovementLedger {
        MovementLedger::new(self.store.clone(), self.locks.clone())
    }

    pub fn movement_service(&self) -> MovementService {
        MovementService::new(self.ledger(), self.config.inventory.clone())
    }

    pub fn alert_service(&self) -> AlertService {
        AlertService::new(self.ledger(), self.thresholds)
    }

    pub fn product_service(&self) -> ProductService {
        ProductService::new(self.ledger())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "Gym Console Inventory API v1"
}
