//! Per-product commit locks
//!
//! Serializes the read-validate-append sequence of a single product inside
//! this process. Different products never contend. Waiters are served in
//! arrival order, so history order matches commit order.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Registry of one async mutex per product
#[derive(Clone)]
pub struct ProductLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    timeout: Duration,
}

/// Held while a product's stock is being committed
pub type CommitGuard = OwnedMutexGuard<()>;

impl ProductLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Wait for exclusive access to a product's stock.
    ///
    /// Times out with [`AppError::StockConflict`] so the caller's retry
    /// policy decides whether to surface `Busy`.
    pub async fn acquire(&self, product_id: Uuid) -> AppResult<CommitGuard> {
        let lock = self
            .locks
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(%product_id, "Timed out waiting for product commit lock");
                Err(AppError::StockConflict)
            }
        }
    }

    /// Number of products that have been locked at least once
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Default for ProductLocks {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_product_is_exclusive() {
        let locks = ProductLocks::new(Duration::from_millis(50));
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await.unwrap();
        let second = locks.acquire(id).await;
        assert!(matches!(second, Err(AppError::StockConflict)));

        drop(guard);
        assert!(locks.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn different_products_do_not_contend() {
        let locks = ProductLocks::new(Duration::from_millis(50));
        let _a = locks.acquire(Uuid::new_v4()).await.unwrap();
        let _b = locks.acquire(Uuid::new_v4()).await.unwrap();
        assert_eq!(locks.tracked(), 2);
    }
}
