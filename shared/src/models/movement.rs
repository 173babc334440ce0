//! Stock movement models and the pure movement planner
//!
//! [`plan_movement`] is the single place where a raw request is turned into a
//! signed delta and checked against the non-negative stock invariant. The
//! server runs it under the product's commit lock; the console runs it
//! through [`preview`] to show the resulting stock while the user types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::quantity::{
    format_quantity, format_signed, max_quantity, normalize, QuantityError, UnitOfMeasure,
};
use crate::types::{contains_ci, normalize_search};

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Incoming stock
    Entrada,
    /// Outgoing stock, bounded by what is on hand
    Salida,
    /// Signed manual correction
    Ajuste,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Salida => "salida",
            MovementType::Ajuste => "ajuste",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = MovementRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" => Ok(MovementType::Entrada),
            "salida" => Ok(MovementType::Salida),
            "ajuste" => Ok(MovementType::Ajuste),
            "" => Err(MovementRejection::Invalid(
                "movement type is required".to_string(),
            )),
            other => Err(MovementRejection::Invalid(format!(
                "unknown movement type '{}'",
                other
            ))),
        }
    }
}

/// A committed, immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    /// Insertion-ordered identifier
    pub id: i64,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed delta applied to the product's stock
    pub quantity: Decimal,
    pub stock_before: Decimal,
    pub stock_after: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A movement joined with the product fields the audit views display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementWithProduct {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub product_name: String,
    pub product_code: String,
    pub unit: UnitOfMeasure,
}

impl MovementWithProduct {
    pub fn quantity_display(&self) -> String {
        format_signed(self.movement.quantity, self.unit)
    }
}

/// Filter for the global movement listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub limit: Option<u32>,
}

impl MovementFilter {
    pub fn matches(&self, row: &MovementWithProduct) -> bool {
        if let Some(kind) = self.movement_type {
            if row.movement.movement_type != kind {
                return false;
            }
        }
        match normalize_search(self.search.as_deref()) {
            Some(needle) => {
                contains_ci(&row.product_name, &needle) || contains_ci(&row.product_code, &needle)
            }
            None => true,
        }
    }
}

/// Quantity as it arrives over the wire: a JSON number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(serde_json::Number),
    Text(String),
}

impl RawQuantity {
    pub fn as_text(&self) -> String {
        match self {
            RawQuantity::Number(n) => n.to_string(),
            RawQuantity::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawQuantity {
    fn from(value: &str) -> Self {
        RawQuantity::Text(value.to_string())
    }
}

/// Request to record a movement.
///
/// Fields are kept loose so malformed input reaches validation and is
/// reported with a typed error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: Uuid,
    #[serde(rename = "type", default)]
    pub movement_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<RawQuantity>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MovementRequest {
    pub fn new(
        product_id: Uuid,
        movement_type: MovementType,
        quantity: impl Into<RawQuantity>,
        notes: Option<String>,
    ) -> Self {
        Self {
            product_id,
            movement_type: Some(movement_type.as_str().to_string()),
            quantity: Some(quantity.into()),
            notes,
        }
    }

    /// Parsed movement type
    pub fn parsed_type(&self) -> Result<MovementType, MovementRejection> {
        self.movement_type.as_deref().unwrap_or("").parse()
    }

    /// Raw quantity text
    pub fn quantity_text(&self) -> Result<String, MovementRejection> {
        self.quantity
            .as_ref()
            .map(RawQuantity::as_text)
            .ok_or_else(|| MovementRejection::Invalid("quantity is required".to_string()))
    }

    /// Notes trimmed, with blanks dropped
    pub fn clean_notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Why a movement cannot be committed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MovementRejection {
    #[error("invalid movement: {0}")]
    Invalid(String),

    #[error("quantity {quantity} is not a whole number of units")]
    QuantityNotIntegral { quantity: Decimal },

    #[error("quantity must be greater than zero")]
    ZeroQuantity,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("adjustment of {delta} would leave stock below zero (current {current})")]
    NegativeResultingStock { current: Decimal, delta: Decimal },
}

impl MovementRejection {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            MovementRejection::Invalid(_) => "VALIDATION_ERROR",
            MovementRejection::QuantityNotIntegral { .. } => "QUANTITY_NOT_INTEGRAL",
            MovementRejection::ZeroQuantity => "ZERO_QUANTITY",
            MovementRejection::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            MovementRejection::NegativeResultingStock { .. } => "NEGATIVE_RESULTING_STOCK",
        }
    }
}

impl From<QuantityError> for MovementRejection {
    fn from(err: QuantityError) -> Self {
        match err {
            QuantityError::NotIntegral(quantity) => {
                MovementRejection::QuantityNotIntegral { quantity }
            }
            other => MovementRejection::Invalid(other.to_string()),
        }
    }
}

/// A validated movement ready to append
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MovementPlan {
    pub movement_type: MovementType,
    pub delta: Decimal,
    pub stock_before: Decimal,
    pub stock_after: Decimal,
}

/// Validate a movement against the current stock and compute its delta
pub fn plan_movement(
    current_stock: Decimal,
    unit: UnitOfMeasure,
    movement_type: MovementType,
    raw_quantity: &str,
) -> Result<MovementPlan, MovementRejection> {
    let quantity = normalize(raw_quantity, unit)?;
    if quantity.is_zero() {
        return Err(MovementRejection::ZeroQuantity);
    }

    let magnitude = quantity.value().abs();
    let delta = match movement_type {
        MovementType::Entrada => magnitude,
        MovementType::Salida => {
            if magnitude > current_stock {
                return Err(MovementRejection::InsufficientStock {
                    available: current_stock,
                    requested: magnitude,
                });
            }
            -magnitude
        }
        MovementType::Ajuste => {
            let delta = quantity.value();
            if resulting_stock(current_stock, delta)? < Decimal::ZERO {
                return Err(MovementRejection::NegativeResultingStock {
                    current: current_stock,
                    delta,
                });
            }
            delta
        }
    };

    let stock_after = resulting_stock(current_stock, delta)?;
    if stock_after > max_quantity() {
        return Err(MovementRejection::Invalid(format!(
            "resulting stock {} exceeds the maximum of {}",
            stock_after.normalize(),
            max_quantity().normalize()
        )));
    }

    Ok(MovementPlan {
        movement_type,
        delta,
        stock_before: current_stock,
        stock_after,
    })
}

fn resulting_stock(current_stock: Decimal, delta: Decimal) -> Result<Decimal, MovementRejection> {
    current_stock
        .checked_add(delta)
        .ok_or_else(|| MovementRejection::Invalid("resulting stock is out of range".to_string()))
}

/// Side-effect free preview of a movement for the console dialogs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPreview {
    pub delta: Option<Decimal>,
    pub resulting_stock: Option<Decimal>,
    pub delta_display: Option<String>,
    pub resulting_display: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn preview(
    current_stock: Decimal,
    unit: UnitOfMeasure,
    movement_type: MovementType,
    raw_quantity: &str,
) -> MovementPreview {
    match plan_movement(current_stock, unit, movement_type, raw_quantity) {
        Ok(plan) => MovementPreview {
            delta: Some(plan.delta),
            resulting_stock: Some(plan.stock_after),
            delta_display: Some(format_signed(plan.delta, unit)),
            resulting_display: Some(format_quantity(plan.stock_after, unit)),
            valid: true,
            error_code: None,
            error: None,
        },
        Err(rejection) => MovementPreview {
            delta: None,
            resulting_stock: None,
            delta_display: None,
            resulting_display: None,
            valid: false,
            error_code: Some(rejection.code().to_string()),
            error: Some(rejection.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn entrada_adds_magnitude() {
        let plan = plan_movement(dec("5"), UnitOfMeasure::Unidad, MovementType::Entrada, "3").unwrap();
        assert_eq!(plan.delta, dec("3"));
        assert_eq!(plan.stock_after, dec("8"));

        // sign on entrada input is ignored
        let plan = plan_movement(dec("5"), UnitOfMeasure::Unidad, MovementType::Entrada, "-3").unwrap();
        assert_eq!(plan.delta, dec("3"));
    }

    #[test]
    fn salida_is_bounded_by_stock() {
        let err = plan_movement(dec("5"), UnitOfMeasure::Unidad, MovementType::Salida, "10").unwrap_err();
        assert_eq!(
            err,
            MovementRejection::InsufficientStock {
                available: dec("5"),
                requested: dec("10"),
            }
        );

        let plan = plan_movement(dec("5"), UnitOfMeasure::Unidad, MovementType::Salida, "5").unwrap();
        assert_eq!(plan.delta, dec("-5"));
        assert_eq!(plan.stock_after, Decimal::ZERO);
    }

    #[test]
    fn ajuste_keeps_sign_and_floor() {
        let plan = plan_movement(dec("2"), UnitOfMeasure::Unidad, MovementType::Ajuste, "-2").unwrap();
        assert_eq!(plan.stock_after, Decimal::ZERO);

        let err = plan_movement(dec("2"), UnitOfMeasure::Unidad, MovementType::Ajuste, "-5").unwrap_err();
        assert_eq!(err.code(), "NEGATIVE_RESULTING_STOCK");

        let plan = plan_movement(dec("2"), UnitOfMeasure::Unidad, MovementType::Ajuste, "4").unwrap();
        assert_eq!(plan.delta, dec("4"));
    }

    #[test]
    fn zero_and_fractional_units_are_rejected() {
        assert_eq!(
            plan_movement(dec("2"), UnitOfMeasure::Unidad, MovementType::Entrada, "0"),
            Err(MovementRejection::ZeroQuantity)
        );
        assert_eq!(
            plan_movement(dec("2"), UnitOfMeasure::Kg, MovementType::Entrada, "0.0002"),
            Err(MovementRejection::ZeroQuantity)
        );
        assert_eq!(
            plan_movement(dec("2"), UnitOfMeasure::Unidad, MovementType::Entrada, "1.5"),
            Err(MovementRejection::QuantityNotIntegral { quantity: dec("1.5") })
        );
    }

    #[test]
    fn kg_entrada_on_fractional_stock() {
        let plan = plan_movement(dec("1.250"), UnitOfMeasure::Kg, MovementType::Entrada, "2.75").unwrap();
        assert_eq!(plan.stock_after, dec("4"));
        assert_eq!(format_quantity(plan.stock_after, UnitOfMeasure::Kg), "4");
    }

    #[test]
    fn oversized_quantities_are_rejected_not_panicking() {
        let err = plan_movement(
            dec("5"),
            UnitOfMeasure::Unidad,
            MovementType::Entrada,
            "79228162514264337593543950335",
        )
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = plan_movement(dec("5"), UnitOfMeasure::Kg, MovementType::Ajuste, "1e12").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        // Fits on its own but pushes the stock past the column range
        let err = plan_movement(
            dec("99999999999"),
            UnitOfMeasure::Unidad,
            MovementType::Entrada,
            "1",
        )
        .unwrap_err();
        assert!(matches!(err, MovementRejection::Invalid(_)));

        let plan = plan_movement(
            dec("99999999998"),
            UnitOfMeasure::Unidad,
            MovementType::Entrada,
            "1",
        )
        .unwrap();
        assert_eq!(plan.stock_after, max_quantity().trunc());
    }

    #[test]
    fn movement_type_parsing() {
        assert_eq!("Salida".parse::<MovementType>().unwrap(), MovementType::Salida);
        assert!(matches!(
            "".parse::<MovementType>(),
            Err(MovementRejection::Invalid(_))
        ));
        assert!("venta".parse::<MovementType>().is_err());
    }

    #[test]
    fn request_reads_number_or_text_quantity() {
        let json = r#"{"product_id":"7f1c5a4e-2b0b-4a43-9a57-6a1f6c0b6f10","type":"entrada","quantity":2.75}"#;
        let req: MovementRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.quantity_text().unwrap(), "2.75");
        assert_eq!(req.parsed_type().unwrap(), MovementType::Entrada);

        let json = r#"{"product_id":"7f1c5a4e-2b0b-4a43-9a57-6a1f6c0b6f10","quantity":"3"}"#;
        let req: MovementRequest = serde_json::from_str(json).unwrap();
        assert!(req.parsed_type().is_err());
        assert_eq!(req.quantity_text().unwrap(), "3");
    }

    #[test]
    fn preview_reports_outcome() {
        let ok = preview(dec("5"), UnitOfMeasure::Unidad, MovementType::Salida, "2");
        assert!(ok.valid);
        assert_eq!(ok.delta_display.as_deref(), Some("-2"));
        assert_eq!(ok.resulting_display.as_deref(), Some("3"));

        let bad = preview(dec("5"), UnitOfMeasure::Unidad, MovementType::Salida, "9");
        assert!(!bad.valid);
        assert_eq!(bad.error_code.as_deref(), Some("INSUFFICIENT_STOCK"));
        assert_eq!(bad.resulting_stock, None);
    }
}
