//! Low-stock alerts derived from current product stock

use shared::{summarize, AlertFilter, AlertSummary, AlertTag, AlertThresholds, ProductFilter};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger::MovementLedger;

#[derive(Clone)]
pub struct AlertService {
    ledger: MovementLedger,
    thresholds: AlertThresholds,
}

impl AlertService {
    pub fn new(ledger: MovementLedger, thresholds: AlertThresholds) -> Self {
        Self { ledger, thresholds }
    }

    /// Alert counters and items for the active catalog
    pub async fn summary(&self, filter: &AlertFilter) -> AppResult<AlertSummary> {
        let products = self.ledger.store().products(&ProductFilter::default()).await?;
        let summary = summarize(&products, filter, &self.thresholds);

        tracing::debug!(
            out = summary.counts.out,
            low = summary.counts.low,
            near = summary.counts.near,
            "Alert summary computed"
        );
        Ok(summary)
    }

    /// Alert tier of one active product, if any
    pub async fn classify(&self, product_id: Uuid) -> AppResult<Option<AlertTag>> {
        let product = self.ledger.active_product(product_id).await?;
        Ok(self.thresholds.classify(&product))
    }
}
