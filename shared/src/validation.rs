//! Validation utilities for product catalog input
//!
//! Movement quantities are validated by the quantity model; these helpers
//! cover the product fields the catalog layer hands to the ledger.

use rust_decimal::Decimal;

use crate::quantity::{normalize_value, QuantityError, UnitOfMeasure};

// ============================================================================
// Product Validations
// ============================================================================

/// Validate product code format (1-30 chars, letters, digits, '-' or '_')
pub fn validate_product_code(code: &str) -> Result<(), &'static str> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Product code is required");
    }
    if code.chars().count() > 30 {
        return Err("Product code must be at most 30 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Product code may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Validate a sale or cost price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price.scale() > 2 && price.round_dp(2) != price {
        return Err("Price supports at most 2 decimal places");
    }
    if price >= Decimal::from(10_000_000_000i64) {
        return Err("Price exceeds the maximum of 10 integer digits");
    }
    Ok(())
}

/// Validate a minimum stock threshold for the given unit
pub fn validate_min_stock(min_stock: Decimal, unit: UnitOfMeasure) -> Result<Decimal, &'static str> {
    if min_stock < Decimal::ZERO {
        return Err("Minimum stock cannot be negative");
    }
    normalize_value(min_stock, unit).map_err(|err| match err {
        QuantityError::OutOfRange(_) => "Minimum stock exceeds the maximum of 11 integer digits",
        _ => "Minimum stock must be a whole number of units",
    })
}

/// Validate an initial stock level for the given unit
pub fn validate_initial_stock(
    initial_stock: Decimal,
    unit: UnitOfMeasure,
) -> Result<Decimal, &'static str> {
    if initial_stock < Decimal::ZERO {
        return Err("Initial stock cannot be negative");
    }
    normalize_value(initial_stock, unit).map_err(|err| match err {
        QuantityError::OutOfRange(_) => "Initial stock exceeds the maximum of 11 integer digits",
        _ => "Initial stock must be a whole number of units",
    })
}
