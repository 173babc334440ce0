//! Route definitions for the inventory API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - product catalog
        .nest("/products", product_routes(state.clone()))
        // Protected routes - movements and alerts
        .nest("/inventory", inventory_routes(state))
}

/// Product catalog routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::deactivate_product),
        )
        .route("/:product_id/movements", get(handlers::get_product_movements))
        .route("/:product_id/stock", get(handlers::get_product_stock))
        .route("/:product_id/reconcile", post(handlers::reconcile_product))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/alerts", get(handlers::get_alerts))
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::submit_movement),
        )
        .route("/movements/preview", post(handlers::preview_movement))
        .route("/reconcile", post(handlers::reconcile_all))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
