//! PostgreSQL ledger store
//!
//! `products.stock` is the cached fold of `stock_movements`. It is only
//! written inside the transaction that inserts the matching movement, using
//! a check-and-set on the previous value; the row lock taken by that UPDATE
//! serializes commits for one product across server instances.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    effective_limit, normalize_search, MovementFilter, MovementType, MovementWithProduct, Product,
    ProductFilter, StockMovement, UnitOfMeasure,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{LedgerStore, NewMovement, NewProduct, ProductChanges};
use crate::error::{AppError, AppResult};

const PRODUCT_COLUMNS: &str = "id, name, code, description, category, sale_price, cost_price, \
     unit, min_stock, stock, active, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, product_id, movement_type, quantity, stock_before, \
     stock_after, notes, created_by, created_at";

#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
    lock_timeout_ms: u64,
}

/// Row for product queries
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    code: String,
    description: Option<String>,
    category: Option<String>,
    sale_price: Decimal,
    cost_price: Decimal,
    unit: String,
    min_stock: Decimal,
    stock: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let unit: UnitOfMeasure = row
            .unit
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt product {}: {}", row.id, e)))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            category: row.category,
            sale_price: row.sale_price,
            cost_price: row.cost_price,
            unit,
            min_stock: row.min_stock,
            stock: row.stock,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row for movement queries
#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    product_id: Uuid,
    movement_type: String,
    quantity: Decimal,
    stock_before: Decimal,
    stock_after: Decimal,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type: MovementType = row
            .movement_type
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt movement {}: {}", row.id, e)))?;
        Ok(StockMovement {
            id: row.id,
            product_id: row.product_id,
            movement_type,
            quantity: row.quantity,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Row for the joined global listing
#[derive(Debug, FromRow)]
struct MovementListRow {
    #[sqlx(flatten)]
    movement: MovementRow,
    product_name: String,
    product_code: String,
    unit: String,
}

impl TryFrom<MovementListRow> for MovementWithProduct {
    type Error = AppError;

    fn try_from(row: MovementListRow) -> Result<Self, Self::Error> {
        let unit: UnitOfMeasure = row
            .unit
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt product unit: {}", e)))?;
        Ok(MovementWithProduct {
            movement: row.movement.try_into()?,
            product_name: row.product_name,
            product_code: row.product_code,
            unit,
        })
    }
}

/// Escape LIKE wildcards in a user-supplied needle
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl PgLedgerStore {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    async fn insert_movement(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        movement: &NewMovement,
    ) -> AppResult<StockMovement> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO stock_movements (
                product_id, movement_type, quantity, stock_before, stock_after, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(movement.product_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.notes)
        .bind(movement.created_by)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn create_product(
        &self,
        product: NewProduct,
        seed: Option<NewMovement>,
    ) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        let initial_stock = seed
            .as_ref()
            .map(|s| s.stock_after)
            .unwrap_or(Decimal::ZERO);

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                id, name, code, description, category, sale_price, cost_price,
                unit, min_stock, stock
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.sale_price)
        .bind(product.cost_price)
        .bind(product.unit.as_str())
        .bind(product.min_stock)
        .bind(initial_stock)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(seed) = seed {
            Self::insert_movement(&mut tx, &seed).await?;
        }

        tx.commit().await?;
        row.try_into()
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $2, description = $3, category = $4, sale_price = $5,
                cost_price = $6, min_stock = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(changes.sale_price)
        .bind(changes.cost_price)
        .bind(changes.min_stock)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::ProductNotFound(id))?;

        row.try_into()
    }

    async fn deactivate_product(&self, id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::ProductNotFound(id))?;

        row.try_into()
    }

    async fn product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM products WHERE 1=1", PRODUCT_COLUMNS));

        if !filter.include_inactive {
            query.push(" AND active = TRUE");
        }
        if let Some(needle) = normalize_search(filter.search.as_deref()) {
            let pattern = like_pattern(&needle);
            query
                .push(" AND (LOWER(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(code) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = filter
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            query.push(" AND category = ").push_bind(category.to_string());
        }
        query.push(" ORDER BY name ASC");

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn append(&self, movement: NewMovement) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;

        // SET LOCAL does not take bind parameters; the value is an integer
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE products
            SET stock = $2, updated_at = NOW()
            WHERE id = $1 AND stock = $3
            RETURNING stock
            "#,
        )
        .bind(movement.product_id)
        .bind(movement.stock_after)
        .bind(movement.stock_before)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            tx.rollback().await?;
            return Err(AppError::StockConflict);
        }

        let committed = Self::insert_movement(&mut tx, &movement).await?;
        tx.commit().await?;
        Ok(committed)
    }

    async fn replayed_stock(&self, product_id: Uuid) -> AppResult<Decimal> {
        let stock = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_movements WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(stock)
    }

    async fn overwrite_cached_stock(
        &self,
        product_id: Uuid,
        expected: Decimal,
        stock: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1 AND stock = $3",
        )
        .bind(product_id)
        .bind(stock)
        .bind(expected)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::StockConflict);
        }
        Ok(())
    }

    async fn history(&self, product_id: Uuid) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM stock_movements WHERE product_id = $1 ORDER BY id DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }

    async fn movements(&self, filter: &MovementFilter) -> AppResult<Vec<MovementWithProduct>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT m.id, m.product_id, m.movement_type, m.quantity, m.stock_before,
                   m.stock_after, m.notes, m.created_by, m.created_at,
                   p.name AS product_name, p.code AS product_code, p.unit
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            WHERE 1=1
            "#,
        );

        if let Some(kind) = filter.movement_type {
            query.push(" AND m.movement_type = ").push_bind(kind.as_str());
        }
        if let Some(needle) = normalize_search(filter.search.as_deref()) {
            let pattern = like_pattern(&needle);
            query
                .push(" AND (LOWER(p.name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(p.code) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query
            .push(" ORDER BY m.id DESC LIMIT ")
            .push_bind(effective_limit(filter.limit) as i64);

        let rows = query
            .build_query_as::<MovementListRow>()
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(MovementWithProduct::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("agua"), "%agua%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
