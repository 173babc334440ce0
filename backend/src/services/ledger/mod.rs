//! Movement ledger: append-only stock history and the stock it derives
//!
//! The ledger is the source of truth for stock. Each product row carries a
//! cached copy of the ledger fold, written only by [`LedgerStore::append`]
//! in the same transaction as the movement, with a check-and-set on the
//! previous value. [`MovementLedger::reconcile`] replays the ledger and
//! repairs the cache if the two ever diverge.

mod memory;
mod postgres;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    MovementFilter, MovementPlan, MovementType, MovementWithProduct, Product, ProductFilter,
    StockMovement, UnitOfMeasure,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::locks::{CommitGuard, ProductLocks};

/// A movement about to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    /// Cached stock the plan was validated against
    pub stock_before: Decimal,
    pub stock_after: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

impl NewMovement {
    pub fn from_plan(
        product_id: Uuid,
        plan: &MovementPlan,
        notes: Option<String>,
        created_by: Option<Uuid>,
    ) -> Self {
        Self {
            product_id,
            movement_type: plan.movement_type,
            quantity: plan.delta,
            stock_before: plan.stock_before,
            stock_after: plan.stock_after,
            notes,
            created_by,
        }
    }

    /// Reject entries that would break ledger arithmetic or the stock floor
    pub fn check(&self) -> AppResult<()> {
        if self.stock_before.checked_add(self.quantity) != Some(self.stock_after) {
            return Err(AppError::Internal(format!(
                "Movement arithmetic mismatch for product {}",
                self.product_id
            )));
        }
        if self.stock_after < Decimal::ZERO {
            return Err(AppError::Internal(format!(
                "Movement would drive product {} below zero",
                self.product_id
            )));
        }
        let sign_ok = match self.movement_type {
            MovementType::Entrada => self.quantity > Decimal::ZERO,
            MovementType::Salida => self.quantity < Decimal::ZERO,
            MovementType::Ajuste => !self.quantity.is_zero(),
        };
        if !sign_ok {
            return Err(AppError::Internal(format!(
                "Movement sign does not match type {}",
                self.movement_type
            )));
        }
        Ok(())
    }
}

/// A product about to be inserted; stock starts at zero
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub unit: UnitOfMeasure,
    pub min_stock: Decimal,
}

/// Catalog fields a product edit may touch. Stock and unit are not among them.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub min_stock: Decimal,
}

/// Persistence seam for the ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Cheap connectivity check
    async fn ping(&self) -> AppResult<()>;

    /// Insert a product, optionally with its seed movement, atomically
    async fn create_product(
        &self,
        product: NewProduct,
        seed: Option<NewMovement>,
    ) -> AppResult<Product>;

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product>;

    async fn deactivate_product(&self, id: Uuid) -> AppResult<Product>;

    /// Product by id, active or not
    async fn product(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>>;

    /// Append a movement and move the cached stock from `stock_before` to
    /// `stock_after` in one unit. Fails with [`AppError::StockConflict`]
    /// without writing anything if the cache no longer holds `stock_before`.
    async fn append(&self, movement: NewMovement) -> AppResult<StockMovement>;

    /// Sum of every movement delta for a product
    async fn replayed_stock(&self, product_id: Uuid) -> AppResult<Decimal>;

    /// Replace the cached stock if it still equals `expected`
    async fn overwrite_cached_stock(
        &self,
        product_id: Uuid,
        expected: Decimal,
        stock: Decimal,
    ) -> AppResult<()>;

    /// Movements of one product, newest first
    async fn history(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>>;

    /// Movements across products, newest first
    async fn movements(&self, filter: &MovementFilter) -> AppResult<Vec<MovementWithProduct>>;
}

/// Where a stock figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockSource {
    Cached,
    Replayed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReading {
    pub product_id: Uuid,
    pub stock: Decimal,
    pub unit: UnitOfMeasure,
    pub source: StockSource,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub product_id: Uuid,
    pub cached_stock: Decimal,
    pub replayed_stock: Decimal,
    pub corrected: bool,
}

/// Ledger operations shared by the movement, alert and product services
#[derive(Clone)]
pub struct MovementLedger {
    store: Arc<dyn LedgerStore>,
    locks: ProductLocks,
}

impl MovementLedger {
    pub fn new(store: Arc<dyn LedgerStore>, locks: ProductLocks) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn locks(&self) -> &ProductLocks {
        &self.locks
    }

    /// Product by id, including deactivated ones
    pub async fn product(&self, product_id: Uuid) -> AppResult<Product> {
        self.store
            .product(product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))
    }

    /// Product by id, rejecting deactivated ones
    pub async fn active_product(&self, product_id: Uuid) -> AppResult<Product> {
        let product = self.product(product_id).await?;
        if !product.active {
            return Err(AppError::ProductNotFound(product_id));
        }
        Ok(product)
    }

    /// Take a product's commit lock, but only for a product that exists.
    ///
    /// Products are never removed, so the lock map only ever holds ids of
    /// real products.
    pub async fn lock_product(&self, product_id: Uuid) -> AppResult<CommitGuard> {
        self.product(product_id).await?;
        self.locks.acquire(product_id).await
    }

    /// Current stock from the cache kept in step with the ledger
    pub async fn current_stock(&self, product_id: Uuid) -> AppResult<StockReading> {
        let product = self.product(product_id).await?;
        Ok(StockReading {
            product_id,
            stock: product.stock,
            unit: product.unit,
            source: StockSource::Cached,
            read_at: Utc::now(),
        })
    }

    /// Current stock recomputed from the full ledger
    pub async fn replayed_stock(&self, product_id: Uuid) -> AppResult<StockReading> {
        let product = self.product(product_id).await?;
        let stock = self.store.replayed_stock(product_id).await?;
        Ok(StockReading {
            product_id,
            stock,
            unit: product.unit,
            source: StockSource::Replayed,
            read_at: Utc::now(),
        })
    }

    /// Append a validated movement. Callers hold the product's commit lock.
    pub async fn append(&self, movement: NewMovement) -> AppResult<StockMovement> {
        movement.check()?;
        self.store.append(movement).await
    }

    /// History of one product, newest first; valid for deactivated products
    pub async fn history(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        self.product(product_id).await?;
        self.store.history(product_id).await
    }

    /// Global audit listing, newest first
    pub async fn all_movements(&self, filter: &MovementFilter) -> AppResult<Vec<MovementWithProduct>> {
        self.store.movements(filter).await
    }

    /// Replay the ledger and repair the cached stock if it drifted
    pub async fn reconcile(&self, product_id: Uuid) -> AppResult<ReconciliationReport> {
        let _guard = self.lock_product(product_id).await?;

        let product = self.product(product_id).await?;
        let replayed = self.store.replayed_stock(product_id).await?;
        let corrected = product.stock != replayed;

        if corrected {
            tracing::warn!(
                %product_id,
                cached = %product.stock,
                replayed = %replayed,
                "Cached stock diverged from ledger, rebuilding"
            );
            self.store
                .overwrite_cached_stock(product_id, product.stock, replayed)
                .await?;
        }

        Ok(ReconciliationReport {
            product_id,
            cached_stock: product.stock,
            replayed_stock: replayed,
            corrected,
        })
    }

    /// Reconcile every product, active or not
    pub async fn reconcile_all(&self) -> AppResult<Vec<ReconciliationReport>> {
        let filter = ProductFilter {
            include_inactive: true,
            ..ProductFilter::default()
        };
        let products = self.store.products(&filter).await?;

        let mut reports = Vec::with_capacity(products.len());
        for product in products {
            reports.push(self.reconcile(product.id).await?);
        }

        let corrected = reports.iter().filter(|r| r.corrected).count();
        tracing::info!(checked = reports.len(), corrected, "Ledger reconciliation finished");
        Ok(reports)
    }
}
