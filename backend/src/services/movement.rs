//! Movement service: the single entry point that mutates stock
//!
//! A submission runs as one critical section per product: take the commit
//! lock, read the product, validate the request against its current stock,
//! then append the movement together with the new cached stock. A commit
//! that loses a race on the cached stock is retried a bounded number of
//! times before the caller gets `Busy`.

use shared::{plan_movement, MovementPreview, MovementRequest, MovementType, StockMovement};
use uuid::Uuid;

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::services::ledger::{MovementLedger, NewMovement};

#[derive(Clone)]
pub struct MovementService {
    ledger: MovementLedger,
    settings: InventoryConfig,
}

/// A request that passed the input checks that do not depend on stock
struct ParsedRequest {
    product_id: Uuid,
    movement_type: MovementType,
    quantity: String,
    notes: Option<String>,
}

impl MovementService {
    pub fn new(ledger: MovementLedger, settings: InventoryConfig) -> Self {
        Self { ledger, settings }
    }

    /// Validate and commit a stock movement
    pub async fn submit_movement(
        &self,
        request: MovementRequest,
        created_by: Option<Uuid>,
    ) -> AppResult<StockMovement> {
        let parsed = Self::parse(&request)?;

        let mut attempt: u32 = 0;
        loop {
            match self.try_commit(&parsed, created_by).await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.settings.commit_retries {
                        tracing::warn!(
                            product_id = %parsed.product_id,
                            attempts = attempt + 1,
                            "Giving up on contended stock commit"
                        );
                        return Err(AppError::Busy(format!(
                            "product {} is being updated concurrently",
                            parsed.product_id
                        )));
                    }
                    attempt += 1;
                    tracing::debug!(
                        product_id = %parsed.product_id,
                        attempt,
                        "Stock changed during commit, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_backoff() * attempt).await;
                }
                result => return result,
            }
        }
    }

    /// Compute what a movement would do without committing it
    pub async fn preview(&self, request: &MovementRequest) -> AppResult<MovementPreview> {
        let movement_type = request.parsed_type()?;
        let quantity = request.quantity_text()?;
        let product = self.ledger.active_product(request.product_id).await?;

        Ok(shared::preview(
            product.stock,
            product.unit,
            movement_type,
            &quantity,
        ))
    }

    fn parse(request: &MovementRequest) -> AppResult<ParsedRequest> {
        Ok(ParsedRequest {
            product_id: request.product_id,
            movement_type: request.parsed_type()?,
            quantity: request.quantity_text()?,
            notes: request.clean_notes(),
        })
    }

    async fn try_commit(
        &self,
        request: &ParsedRequest,
        created_by: Option<Uuid>,
    ) -> AppResult<StockMovement> {
        let _guard = self.ledger.lock_product(request.product_id).await?;

        // Re-read under the lock; the stock may have moved while waiting
        let product = self.ledger.active_product(request.product_id).await?;
        let plan = plan_movement(
            product.stock,
            product.unit,
            request.movement_type,
            &request.quantity,
        )?;

        let movement = self
            .ledger
            .append(NewMovement::from_plan(
                product.id,
                &plan,
                request.notes.clone(),
                created_by,
            ))
            .await?;

        tracing::info!(
            product_id = %product.id,
            code = %product.code,
            movement_id = movement.id,
            movement_type = %movement.movement_type,
            quantity = %movement.quantity,
            stock_after = %movement.stock_after,
            "Stock movement committed"
        );

        Ok(movement)
    }
}
