//! Stock alert classification
//!
//! Alerts are computed, never stored: every product's current stock is
//! compared with its configured minimum.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Product;
use crate::quantity::{format_quantity, UnitOfMeasure};
use crate::types::normalize_search;

/// Alert tier, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTag {
    /// Nothing left on hand
    Out,
    /// At or below the minimum
    Low,
    /// Within the buffer above the minimum
    Near,
}

impl AlertTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTag::Out => "out",
            AlertTag::Low => "low",
            AlertTag::Near => "near",
        }
    }
}

impl fmt::Display for AlertTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier selector used by the alerts view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTypeFilter {
    #[default]
    All,
    Out,
    Low,
    Near,
}

impl AlertTypeFilter {
    pub fn accepts(&self, tag: AlertTag) -> bool {
        match self {
            AlertTypeFilter::All => true,
            AlertTypeFilter::Out => tag == AlertTag::Out,
            AlertTypeFilter::Low => tag == AlertTag::Low,
            AlertTypeFilter::Near => tag == AlertTag::Near,
        }
    }
}

impl FromStr for AlertTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(AlertTypeFilter::All),
            "out" => Ok(AlertTypeFilter::Out),
            "low" => Ok(AlertTypeFilter::Low),
            "near" => Ok(AlertTypeFilter::Near),
            other => Err(format!("unknown alert type '{}'", other)),
        }
    }
}

/// Classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Upper bound of the `near` tier as a multiple of the minimum stock
    pub near_multiplier: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            near_multiplier: Decimal::new(12, 1),
        }
    }
}

impl AlertThresholds {
    pub fn new(near_multiplier: Decimal) -> Result<Self, &'static str> {
        if near_multiplier < Decimal::ONE {
            return Err("Near threshold multiplier must be at least 1");
        }
        Ok(Self { near_multiplier })
    }

    /// Classify a stock level against a minimum
    pub fn classify_stock(&self, stock: Decimal, min_stock: Decimal) -> Option<AlertTag> {
        if stock <= Decimal::ZERO {
            Some(AlertTag::Out)
        } else if stock <= min_stock {
            Some(AlertTag::Low)
        } else if min_stock
            .checked_mul(self.near_multiplier)
            .map_or(true, |bound| stock <= bound)
        {
            Some(AlertTag::Near)
        } else {
            None
        }
    }

    /// Classify a product; healthy products yield `None`
    pub fn classify(&self, product: &Product) -> Option<AlertTag> {
        self.classify_stock(product.stock, product.min_stock)
    }
}

/// Filters accepted by the alerts view
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type", default)]
    pub alert_type: AlertTypeFilter,
}

/// One product in the alert listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    pub product_id: Uuid,
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub unit: UnitOfMeasure,
    pub stock: Decimal,
    pub min_stock: Decimal,
    pub stock_display: String,
    pub tag: AlertTag,
}

/// Per-tier counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub out: usize,
    pub low: usize,
    pub near: usize,
}

impl AlertCounts {
    fn record(&mut self, tag: AlertTag) {
        match tag {
            AlertTag::Out => self.out += 1,
            AlertTag::Low => self.low += 1,
            AlertTag::Near => self.near += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.out + self.low + self.near
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub counts: AlertCounts,
    pub items: Vec<AlertItem>,
}

/// Build the alerts view.
///
/// Counters only honour `search` and `category` so they stay put while the
/// user switches between tiers; `alert_type` narrows `items` alone. Items are
/// ordered by severity, then stock ascending, then name.
pub fn summarize(
    products: &[Product],
    filter: &AlertFilter,
    thresholds: &AlertThresholds,
) -> AlertSummary {
    let needle = normalize_search(filter.search.as_deref());
    let category = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let mut summary = AlertSummary::default();

    for product in products.iter().filter(|p| p.active) {
        if let Some(needle) = needle.as_deref() {
            if !product.matches_search(needle) {
                continue;
            }
        }
        if let Some(category) = category {
            if !product.in_category(category) {
                continue;
            }
        }

        let Some(tag) = thresholds.classify(product) else {
            continue;
        };
        summary.counts.record(tag);

        if filter.alert_type.accepts(tag) {
            summary.items.push(AlertItem {
                product_id: product.id,
                name: product.name.clone(),
                code: product.code.clone(),
                category: product.category.clone(),
                unit: product.unit,
                stock: product.stock,
                min_stock: product.min_stock,
                stock_display: format_quantity(product.stock, product.unit),
                tag,
            });
        }
    }

    summary.items.sort_by(|a, b| {
        a.tag
            .cmp(&b.tag)
            .then(a.stock.cmp(&b.stock))
            .then_with(|| a.name.cmp(&b.name))
    });

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, stock: i64, min_stock: i64, category: Option<&str>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: name.to_uppercase(),
            description: None,
            category: category.map(str::to_string),
            sale_price: Decimal::ZERO,
            cost_price: Decimal::ZERO,
            unit: UnitOfMeasure::Unidad,
            min_stock: Decimal::from(min_stock),
            stock: Decimal::from(stock),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tier_boundaries_with_default_multiplier() {
        let t = AlertThresholds::default();
        let min = Decimal::from(10);
        assert_eq!(t.classify_stock(Decimal::ZERO, min), Some(AlertTag::Out));
        assert_eq!(t.classify_stock(Decimal::from(7), min), Some(AlertTag::Low));
        assert_eq!(t.classify_stock(Decimal::from(10), min), Some(AlertTag::Low));
        assert_eq!(t.classify_stock(Decimal::from(11), min), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(Decimal::from(12), min), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(Decimal::from(13), min), None);
    }

    #[test]
    fn zero_minimum_only_flags_out() {
        let t = AlertThresholds::default();
        assert_eq!(t.classify_stock(Decimal::ZERO, Decimal::ZERO), Some(AlertTag::Out));
        assert_eq!(t.classify_stock(Decimal::ONE, Decimal::ZERO), None);
    }

    #[test]
    fn multiplier_is_configurable() {
        let t = AlertThresholds::new(Decimal::new(15, 1)).unwrap();
        assert_eq!(t.classify_stock(Decimal::from(15), Decimal::from(10)), Some(AlertTag::Near));
        assert!(AlertThresholds::new(Decimal::new(9, 1)).is_err());
    }

    #[test]
    fn huge_multiplier_does_not_overflow() {
        let t = AlertThresholds::new(Decimal::MAX).unwrap();
        let min = Decimal::from(10);
        assert_eq!(t.classify_stock(Decimal::from(11), min), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(Decimal::from(5), min), Some(AlertTag::Low));
    }

    #[test]
    fn counts_ignore_alert_type_filter() {
        let products = vec![
            product("Agua", 0, 10, Some("Bebidas")),
            product("Barra", 5, 10, Some("Snacks")),
            product("Creatina", 11, 10, Some("Suplementos")),
            product("Toalla", 50, 10, None),
        ];
        let t = AlertThresholds::default();

        let all = summarize(&products, &AlertFilter::default(), &t);
        assert_eq!(all.counts, AlertCounts { out: 1, low: 1, near: 1 });
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.items[0].tag, AlertTag::Out);
        assert_eq!(all.items[2].tag, AlertTag::Near);

        let only_low = AlertFilter {
            alert_type: AlertTypeFilter::Low,
            ..Default::default()
        };
        let low = summarize(&products, &only_low, &t);
        assert_eq!(low.counts, all.counts);
        assert_eq!(low.items.len(), 1);
        assert_eq!(low.items[0].name, "Barra");
    }

    #[test]
    fn search_and_category_narrow_counts() {
        let products = vec![
            product("Agua", 0, 10, Some("Bebidas")),
            product("Agua Saborizada", 3, 10, Some("Bebidas")),
            product("Barra", 5, 10, Some("Snacks")),
        ];
        let t = AlertThresholds::default();
        let filter = AlertFilter {
            search: Some("AGUA".into()),
            category: Some("Bebidas".into()),
            alert_type: AlertTypeFilter::All,
        };
        let summary = summarize(&products, &filter, &t);
        assert_eq!(summary.counts, AlertCounts { out: 1, low: 1, near: 0 });
    }

    #[test]
    fn inactive_products_are_excluded() {
        let mut gone = product("Guantes", 0, 5, None);
        gone.active = false;
        let summary = summarize(&[gone], &AlertFilter::default(), &AlertThresholds::default());
        assert_eq!(summary.counts.total(), 0);
    }

    #[test]
    fn alert_type_parsing() {
        assert_eq!("".parse::<AlertTypeFilter>().unwrap(), AlertTypeFilter::All);
        assert_eq!("NEAR".parse::<AlertTypeFilter>().unwrap(), AlertTypeFilter::Near);
        assert!("critical".parse::<AlertTypeFilter>().is_err());
    }
}
