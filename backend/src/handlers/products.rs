//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{Product, ProductFilter, StockMovement};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser, INVENTORY_WRITE};
use crate::services::product::{CreateProductInput, UpdateProductInput};
use crate::services::{ReconciliationReport, StockReading, StockSource};
use crate::AppState;

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.product_service().list(&filter).await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let product = state
        .product_service()
        .create(input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(product))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let product = state.product_service().get(product_id).await?;
    Ok(Json(product))
}

/// Update catalog fields
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let product = state.product_service().update(product_id, input).await?;
    Ok(Json(product))
}

/// Deactivate a product
pub async fn deactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let product = state.product_service().deactivate(product_id).await?;
    Ok(Json(product))
}

/// Movement history of a product, newest first
pub async fn get_product_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let movements = state.product_service().movements(product_id).await?;
    Ok(Json(movements))
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub source: Option<StockSource>,
}

/// Current stock of a product; `?source=replayed` sums the ledger instead
pub async fn get_product_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<StockReading>> {
    let reading = match query.source {
        Some(StockSource::Replayed) => state.ledger().replayed_stock(product_id).await?,
        _ => state.ledger().current_stock(product_id).await?,
    };
    Ok(Json(reading))
}

/// Replay one product's ledger and repair its cached stock
pub async fn reconcile_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ReconciliationReport>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let report = state.ledger().reconcile(product_id).await?;
    Ok(Json(report))
}
