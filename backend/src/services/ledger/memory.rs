//! In-memory ledger store
//!
//! Used for tests and local runs without PostgreSQL. A single write lock
//! covers the product table and the movement log, so an append and its
//! cache update are observed together.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    effective_limit, MovementFilter, MovementWithProduct, Product, ProductFilter, StockMovement,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LedgerStore, NewMovement, NewProduct, ProductChanges};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    movements: Vec<StockMovement>,
    next_movement_id: i64,
}

impl MemoryState {
    fn push_movement(&mut self, movement: NewMovement) -> StockMovement {
        self.next_movement_id += 1;
        let entry = StockMovement {
            id: self.next_movement_id,
            product_id: movement.product_id,
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            stock_before: movement.stock_before,
            stock_after: movement.stock_after,
            notes: movement.notes,
            created_by: movement.created_by,
            created_at: Utc::now(),
        };
        self.movements.push(entry.clone());
        entry
    }
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load products and movements as-is, e.g. from an export.
    ///
    /// Cached stock is taken verbatim; run a reconciliation afterwards if the
    /// snapshot may be inconsistent.
    pub fn with_snapshot(products: Vec<Product>, movements: Vec<StockMovement>) -> Self {
        let next_movement_id = movements.iter().map(|m| m.id).max().unwrap_or(0);
        let mut movements = movements;
        movements.sort_by_key(|m| m.id);
        Self {
            state: RwLock::new(MemoryState {
                products: products.into_iter().map(|p| (p.id, p)).collect(),
                movements,
                next_movement_id,
            }),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn create_product(
        &self,
        product: NewProduct,
        seed: Option<NewMovement>,
    ) -> AppResult<Product> {
        let mut state = self.state.write().await;

        if state.products.values().any(|p| p.code == product.code) {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let now = Utc::now();
        let mut created = Product {
            id: product.id,
            name: product.name,
            code: product.code,
            description: product.description,
            category: product.category,
            sale_price: product.sale_price,
            cost_price: product.cost_price,
            unit: product.unit,
            min_stock: product.min_stock,
            stock: Decimal::ZERO,
            active: true,
            created_at: now,
            updated_at: now,
        };

        if let Some(seed) = seed {
            created.stock = seed.stock_after;
            state.push_movement(seed);
        }

        state.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(AppError::ProductNotFound(id))?;

        product.name = changes.name;
        product.description = changes.description;
        product.category = changes.category;
        product.sale_price = changes.sale_price;
        product.cost_price = changes.cost_price;
        product.min_stock = changes.min_stock;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn deactivate_product(&self, id: Uuid) -> AppResult<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(AppError::ProductNotFound(id))?;

        product.active = false;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn append(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&movement.product_id)
            .ok_or(AppError::ProductNotFound(movement.product_id))?;

        if product.stock != movement.stock_before {
            return Err(AppError::StockConflict);
        }
        product.stock = movement.stock_after;
        product.updated_at = Utc::now();

        Ok(state.push_movement(movement))
    }

    async fn replayed_stock(&self, product_id: Uuid) -> AppResult<Decimal> {
        let state = self.state.read().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .map(|m| m.quantity)
            .sum())
    }

    async fn overwrite_cached_stock(
        &self,
        product_id: Uuid,
        expected: Decimal,
        stock: Decimal,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(AppError::ProductNotFound(product_id))?;

        if product.stock != expected {
            return Err(AppError::StockConflict);
        }
        product.stock = stock;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn history(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let state = self.state.read().await;
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn movements(&self, filter: &MovementFilter) -> AppResult<Vec<MovementWithProduct>> {
        let state = self.state.read().await;
        let limit = effective_limit(filter.limit);

        Ok(state
            .movements
            .iter()
            .rev()
            .filter_map(|m| {
                state.products.get(&m.product_id).map(|p| MovementWithProduct {
                    movement: m.clone(),
                    product_name: p.name.clone(),
                    product_code: p.code.clone(),
                    unit: p.unit,
                })
            })
            .filter(|row| filter.matches(row))
            .take(limit)
            .collect())
    }
}
