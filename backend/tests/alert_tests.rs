//! Alert classification tests
//!
//! Tier boundaries, counter/filter semantics and the alert service reading
//! stock after committed movements.

use std::str::FromStr;
use std::sync::Arc;

use gym_stock_backend::config::InventoryConfig;
use gym_stock_backend::services::product::CreateProductInput;
use gym_stock_backend::services::{
    AlertService, InMemoryLedgerStore, MovementLedger, MovementService, ProductLocks,
    ProductService,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    AlertFilter, AlertTag, AlertThresholds, AlertTypeFilter, MovementRequest, MovementType,
    UnitOfMeasure,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_for_min_ten() {
        let t = AlertThresholds::default();
        let min = dec("10");
        assert_eq!(t.classify_stock(dec("0"), min), Some(AlertTag::Out));
        assert_eq!(t.classify_stock(dec("7"), min), Some(AlertTag::Low));
        assert_eq!(t.classify_stock(dec("10"), min), Some(AlertTag::Low));
        assert_eq!(t.classify_stock(dec("11"), min), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(dec("12"), min), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(dec("13"), min), None);
    }

    #[test]
    fn test_zero_minimum_only_flags_out() {
        let t = AlertThresholds::default();
        assert_eq!(t.classify_stock(dec("0"), dec("0")), Some(AlertTag::Out));
        assert_eq!(t.classify_stock(dec("0.001"), dec("0")), None);
    }

    #[test]
    fn test_custom_multiplier() {
        let t = AlertThresholds::new(dec("1.5")).unwrap();
        assert_eq!(t.classify_stock(dec("15"), dec("10")), Some(AlertTag::Near));
        assert_eq!(t.classify_stock(dec("16"), dec("10")), None);
        assert!(AlertThresholds::new(dec("0.9")).is_err());
    }

    #[test]
    fn test_alert_type_filter_parsing() {
        assert_eq!("".parse::<AlertTypeFilter>().unwrap(), AlertTypeFilter::All);
        assert_eq!("LOW".parse::<AlertTypeFilter>().unwrap(), AlertTypeFilter::Low);
        assert!("critical".parse::<AlertTypeFilter>().is_err());
    }
}

// ============================================================================
// Service Tests
// ============================================================================

struct Catalog {
    products: ProductService,
    movements: MovementService,
    alerts: AlertService,
}

fn catalog() -> Catalog {
    let ledger = MovementLedger::new(
        Arc::new(InMemoryLedgerStore::new()),
        ProductLocks::default(),
    );
    Catalog {
        products: ProductService::new(ledger.clone()),
        movements: MovementService::new(ledger.clone(), InventoryConfig::default()),
        alerts: AlertService::new(ledger, AlertThresholds::default()),
    }
}

impl Catalog {
    async fn add(
        &self,
        name: &str,
        code: &str,
        category: &str,
        min: &str,
        stock: &str,
    ) -> uuid::Uuid {
        self.products
            .create(
                CreateProductInput {
                    name: name.to_string(),
                    code: code.to_string(),
                    description: None,
                    category: Some(category.to_string()),
                    sale_price: Decimal::ZERO,
                    cost_price: Decimal::ZERO,
                    unit: UnitOfMeasure::Unidad,
                    min_stock: dec(min),
                    initial_stock: dec(stock),
                },
                None,
            )
            .await
            .unwrap()
            .id
    }
}

#[tokio::test]
async fn summary_counts_ignore_type_filter() {
    let c = catalog();
    c.add("Agua", "AGUA", "Bebidas", "10", "0").await;
    c.add("Isotónica", "ISO", "Bebidas", "10", "8").await;
    c.add("Barra", "BARRA", "Snacks", "10", "12").await;
    c.add("Toalla", "TOALLA", "Accesorios", "10", "50").await;

    let all = c.alerts.summary(&AlertFilter::default()).await.unwrap();
    assert_eq!(all.counts.out, 1);
    assert_eq!(all.counts.low, 1);
    assert_eq!(all.counts.near, 1);
    assert_eq!(all.counts.total(), 3);
    let tags: Vec<AlertTag> = all.items.iter().map(|i| i.tag).collect();
    assert_eq!(tags, vec![AlertTag::Out, AlertTag::Low, AlertTag::Near]);

    let low_only = c
        .alerts
        .summary(&AlertFilter {
            alert_type: AlertTypeFilter::Low,
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(low_only.counts.total(), 3);
    assert_eq!(low_only.items.len(), 1);
    assert_eq!(low_only.items[0].code, "ISO");

    let bebidas = c
        .alerts
        .summary(&AlertFilter {
            category: Some("Bebidas".to_string()),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(bebidas.counts.total(), 2);

    let search = c
        .alerts
        .summary(&AlertFilter {
            search: Some("barr".to_string()),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(search.counts.near, 1);
    assert_eq!(search.items[0].stock_display, "12");
}

#[tokio::test]
async fn alerts_follow_committed_movements() {
    let c = catalog();
    let id = c.add("Agua", "AGUA", "Bebidas", "5", "20").await;
    assert_eq!(c.alerts.classify(id).await.unwrap(), None);

    c.movements
        .submit_movement(MovementRequest::new(id, MovementType::Salida, "15", None), None)
        .await
        .unwrap();
    assert_eq!(c.alerts.classify(id).await.unwrap(), Some(AlertTag::Low));

    c.movements
        .submit_movement(MovementRequest::new(id, MovementType::Salida, "5", None), None)
        .await
        .unwrap();
    assert_eq!(c.alerts.classify(id).await.unwrap(), Some(AlertTag::Out));
}

#[tokio::test]
async fn deactivated_products_leave_the_alerts_view() {
    let c = catalog();
    let id = c.add("Agua", "AGUA", "Bebidas", "5", "0").await;
    assert_eq!(c.alerts.summary(&AlertFilter::default()).await.unwrap().counts.out, 1);

    c.products.deactivate(id).await.unwrap();
    let summary = c.alerts.summary(&AlertFilter::default()).await.unwrap();
    assert_eq!(summary.counts.total(), 0);
    assert!(summary.items.is_empty());
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Exactly one tier (or none) applies and tiers follow stock order
    #[test]
    fn prop_tiers_are_monotonic(min in 0i64..1000, a in 0i64..2000, b in 0i64..2000) {
        let t = AlertThresholds::default();
        let min = Decimal::from(min);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let severity = |stock: i64| match t.classify_stock(Decimal::from(stock), min) {
            Some(AlertTag::Out) => 0,
            Some(AlertTag::Low) => 1,
            Some(AlertTag::Near) => 2,
            None => 3,
        };
        prop_assert!(severity(lo) <= severity(hi));
    }

    /// Zero stock is always out, regardless of the minimum
    #[test]
    fn prop_zero_stock_is_out(min in 0i64..1000) {
        let t = AlertThresholds::default();
        prop_assert_eq!(t.classify_stock(Decimal::ZERO, Decimal::from(min)), Some(AlertTag::Out));
    }
}
