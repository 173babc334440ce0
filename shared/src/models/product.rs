//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quantity::{format_quantity, UnitOfMeasure};
use crate::types::{contains_ci, normalize_search};

/// A stocked product.
///
/// `stock` is a cache of the ledger fold for this product; it is only ever
/// written together with a movement append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unique product code, stored uppercase
    pub code: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub unit: UnitOfMeasure,
    pub min_stock: Decimal,
    pub stock: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock rendered for the product's unit
    pub fn stock_display(&self) -> String {
        format_quantity(self.stock, self.unit)
    }

    /// Case-insensitive match on name or code; `needle` must be normalized
    pub fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.name, needle) || contains_ci(&self.code, needle)
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.category.as_deref() == Some(category)
    }
}

/// Listing filter for products
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.active {
            return false;
        }
        if let Some(needle) = normalize_search(self.search.as_deref()) {
            if !product.matches_search(&needle) {
                return false;
            }
        }
        match self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => product.in_category(category),
            None => true,
        }
    }
}

/// Normalize a product code for storage and display
pub fn normalize_product_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, code: &str, category: Option<&str>, active: bool) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            description: None,
            category: category.map(str::to_string),
            sale_price: Decimal::new(2500, 2),
            cost_price: Decimal::new(1500, 2),
            unit: UnitOfMeasure::Unidad,
            min_stock: Decimal::from(5),
            stock: Decimal::from(12),
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches_name_or_code() {
        let p = product("Proteína Whey", "PROT-01", Some("Suplementos"), true);
        let by_name = ProductFilter {
            search: Some("whey".into()),
            ..Default::default()
        };
        let by_code = ProductFilter {
            search: Some("prot-0".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&p));
        assert!(by_code.matches(&p));
    }

    #[test]
    fn filter_category_is_exact() {
        let p = product("Agua", "AGUA", Some("Bebidas"), true);
        let exact = ProductFilter {
            category: Some("Bebidas".into()),
            ..Default::default()
        };
        let partial = ProductFilter {
            category: Some("Bebida".into()),
            ..Default::default()
        };
        assert!(exact.matches(&p));
        assert!(!partial.matches(&p));
    }

    #[test]
    fn inactive_products_hidden_by_default() {
        let p = product("Toalla", "TOA", None, false);
        assert!(!ProductFilter::default().matches(&p));
        let all = ProductFilter {
            include_inactive: true,
            ..Default::default()
        };
        assert!(all.matches(&p));
    }

    #[test]
    fn code_is_uppercased() {
        assert_eq!(normalize_product_code("  bcaa-2 "), "BCAA-2");
    }
}
