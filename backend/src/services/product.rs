//! Product catalog service
//!
//! Stock is never edited here. A new product's initial stock enters the
//! ledger as its first `entrada` movement, committed with the product row.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_product_code, plan_movement, validate_initial_stock, validate_min_stock,
    validate_price, validate_product_code, MovementType, Product, ProductFilter, StockMovement,
    UnitOfMeasure,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{MovementLedger, NewMovement, NewProduct, ProductChanges};

/// Notes attached to the seed movement of a new product
pub const INITIAL_STOCK_NOTE: &str = "Stock inicial";

#[derive(Clone)]
pub struct ProductService {
    ledger: MovementLedger,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub unit: UnitOfMeasure,
    #[serde(default)]
    pub min_stock: Decimal,
    #[serde(default)]
    pub initial_stock: Decimal,
}

/// Input for editing catalog fields; unit and stock are not editable
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    pub sale_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub min_stock: Option<Decimal>,
}

fn invalid(field: &str, message: &str, message_es: &str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_es: message_es.to_string(),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_price(field: &str, price: Decimal) -> AppResult<()> {
    validate_price(price).map_err(|msg| invalid(field, msg, "Precio inválido"))
}

impl ProductService {
    pub fn new(ledger: MovementLedger) -> Self {
        Self { ledger }
    }

    /// Create a product, seeding its initial stock through the ledger
    pub async fn create(
        &self,
        input: CreateProductInput,
        created_by: Option<Uuid>,
    ) -> AppResult<Product> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid(
                "name",
                "Product name is required",
                "El nombre del producto es obligatorio",
            ));
        }

        let code = normalize_product_code(&input.code);
        validate_product_code(&code)
            .map_err(|msg| invalid("code", msg, "Código de producto inválido"))?;
        check_price("sale_price", input.sale_price)?;
        check_price("cost_price", input.cost_price)?;

        let min_stock = validate_min_stock(input.min_stock, input.unit)
            .map_err(|msg| invalid("min_stock", msg, "Stock mínimo inválido"))?;
        let initial_stock = validate_initial_stock(input.initial_stock, input.unit)
            .map_err(|msg| invalid("initial_stock", msg, "Stock inicial inválido"))?;

        let id = Uuid::new_v4();
        let seed = if initial_stock.is_zero() {
            None
        } else {
            let plan = plan_movement(
                Decimal::ZERO,
                input.unit,
                MovementType::Entrada,
                &initial_stock.to_string(),
            )?;
            Some(NewMovement::from_plan(
                id,
                &plan,
                Some(INITIAL_STOCK_NOTE.to_string()),
                created_by,
            ))
        };
        if let Some(seed) = &seed {
            seed.check()?;
        }

        let product = self
            .ledger
            .store()
            .create_product(
                NewProduct {
                    id,
                    name,
                    code,
                    description: blank_to_none(input.description),
                    category: blank_to_none(input.category),
                    sale_price: input.sale_price,
                    cost_price: input.cost_price,
                    unit: input.unit,
                    min_stock,
                },
                seed,
            )
            .await?;

        tracing::info!(
            product_id = %product.id,
            code = %product.code,
            stock = %product.stock,
            "Product created"
        );
        Ok(product)
    }

    /// Edit catalog fields of an existing product
    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        let current = self.ledger.product(id).await?;

        let name = match input.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(invalid(
                        "name",
                        "Product name is required",
                        "El nombre del producto es obligatorio",
                    ));
                }
                name
            }
            None => current.name,
        };

        let sale_price = input.sale_price.unwrap_or(current.sale_price);
        let cost_price = input.cost_price.unwrap_or(current.cost_price);
        check_price("sale_price", sale_price)?;
        check_price("cost_price", cost_price)?;

        let min_stock = match input.min_stock {
            Some(value) => validate_min_stock(value, current.unit)
                .map_err(|msg| invalid("min_stock", msg, "Stock mínimo inválido"))?,
            None => current.min_stock,
        };

        let changes = ProductChanges {
            name,
            description: match input.description {
                Some(d) => blank_to_none(Some(d)),
                None => current.description,
            },
            category: match input.category {
                Some(c) => blank_to_none(Some(c)),
                None => current.category,
            },
            sale_price,
            cost_price,
            min_stock,
        };

        let product = self.ledger.store().update_product(id, changes).await?;
        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Hide a product from the catalog; its history stays readable
    pub async fn deactivate(&self, id: Uuid) -> AppResult<Product> {
        let product = self.ledger.store().deactivate_product(id).await?;
        tracing::info!(product_id = %id, code = %product.code, "Product deactivated");
        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.ledger.product(id).await
    }

    pub async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        self.ledger.store().products(filter).await
    }

    /// Movement history of a product, newest first
    pub async fn movements(&self, id: Uuid) -> AppResult<Vec<StockMovement>> {
        self.ledger.history(id).await
    }
}
