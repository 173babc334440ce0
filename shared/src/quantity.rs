//! Unit-aware stock quantities
//!
//! Products are counted either in whole units (`unidad`) or by weight (`kg`,
//! carried to three decimal places). Raw user input is normalized here before
//! it reaches the ledger, and every stock figure shown in the console is
//! rendered through [`format_quantity`] / [`format_signed`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places kept for weighed products
pub const KG_SCALE: u32 = 3;

/// Integer digits a stock figure may carry (`NUMERIC(14,3)` columns)
pub const MAX_INTEGER_DIGITS: u32 = 11;

/// Largest magnitude accepted for any quantity or stock level
pub fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, KG_SCALE)
}

/// Unit of measure of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Unidad,
    Kg,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Unidad => "unidad",
            UnitOfMeasure::Kg => "kg",
        }
    }

    /// Number of decimal places a quantity in this unit may carry
    pub fn scale(&self) -> u32 {
        match self {
            UnitOfMeasure::Unidad => 0,
            UnitOfMeasure::Kg => KG_SCALE,
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitOfMeasure {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unidad" => Ok(UnitOfMeasure::Unidad),
            "kg" => Ok(UnitOfMeasure::Kg),
            other => Err(QuantityError::UnknownUnit(other.to_string())),
        }
    }
}

/// Reasons a raw quantity cannot be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is required")]
    Missing,

    #[error("'{0}' is not a valid number")]
    NotNumeric(String),

    #[error("quantity {0} must be a whole number of units")]
    NotIntegral(Decimal),

    #[error("unknown unit of measure '{0}'")]
    UnknownUnit(String),

    #[error("quantity {0} exceeds the maximum of {MAX_INTEGER_DIGITS} integer digits")]
    OutOfRange(Decimal),
}

/// A decimal amount scoped to a unit of measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    value: Decimal,
    unit: UnitOfMeasure,
}

impl Quantity {
    /// Build a quantity from an already-parsed value, applying unit rules
    pub fn new(value: Decimal, unit: UnitOfMeasure) -> Result<Self, QuantityError> {
        let value = normalize_value(value, unit)?;
        Ok(Self { value, unit })
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_quantity(self.value, self.unit))
    }
}

/// Parse user input into a decimal.
///
/// Accepts a comma as decimal separator ("2,5") when no dot is present, and
/// scientific notation as produced by JSON number encoders.
pub fn parse_decimal(raw: &str) -> Result<Decimal, QuantityError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QuantityError::Missing);
    }

    let candidate = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&candidate)
        .or_else(|_| Decimal::from_scientific(&candidate))
        .map_err(|_| QuantityError::NotNumeric(trimmed.to_string()))
}

/// Apply unit rules to a parsed value.
///
/// `unidad` rejects fractions; `kg` rounds half away from zero to three places.
/// Magnitudes beyond [`max_quantity`] are rejected for both units.
pub fn normalize_value(value: Decimal, unit: UnitOfMeasure) -> Result<Decimal, QuantityError> {
    if value.abs() > max_quantity() {
        return Err(QuantityError::OutOfRange(value));
    }
    match unit {
        UnitOfMeasure::Unidad => {
            if value.fract().is_zero() {
                Ok(value.trunc().normalize())
            } else {
                Err(QuantityError::NotIntegral(value))
            }
        }
        UnitOfMeasure::Kg => Ok(value
            .round_dp_with_strategy(KG_SCALE, RoundingStrategy::MidpointAwayFromZero)
            .normalize()),
    }
}

/// Normalize raw input for the given unit
pub fn normalize(raw: &str, unit: UnitOfMeasure) -> Result<Quantity, QuantityError> {
    let value = parse_decimal(raw)?;
    Quantity::new(value, unit)
}

/// Render a quantity for display: no decimals for `unidad`, up to three for
/// `kg` with trailing zeros stripped. Never returns an empty string.
pub fn format_quantity(value: Decimal, unit: UnitOfMeasure) -> String {
    let rounded = value
        .round_dp_with_strategy(unit.scale(), RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.to_string();
    if text.is_empty() || text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

/// Render a movement delta with an explicit sign ("+3", "-1.25", "0")
pub fn format_signed(delta: Decimal, unit: UnitOfMeasure) -> String {
    let magnitude = format_quantity(delta.abs(), unit);
    if magnitude == "0" {
        return magnitude;
    }
    if delta.is_sign_negative() {
        format!("-{}", magnitude)
    } else {
        format!("+{}", magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn unidad_accepts_whole_numbers() {
        let q = normalize("3", UnitOfMeasure::Unidad).unwrap();
        assert_eq!(q.value(), dec("3"));
        let q = normalize("4.000", UnitOfMeasure::Unidad).unwrap();
        assert_eq!(q.value(), dec("4"));
    }

    #[test]
    fn unidad_rejects_fractions() {
        assert_eq!(
            normalize("2.5", UnitOfMeasure::Unidad),
            Err(QuantityError::NotIntegral(dec("2.5")))
        );
    }

    #[test]
    fn kg_rounds_to_three_places() {
        let q = normalize("1.23456", UnitOfMeasure::Kg).unwrap();
        assert_eq!(q.value(), dec("1.235"));
        let q = normalize("0.0004", UnitOfMeasure::Kg).unwrap();
        assert!(q.is_zero());
    }

    #[test]
    fn comma_separator_is_accepted() {
        let q = normalize("2,75", UnitOfMeasure::Kg).unwrap();
        assert_eq!(q.value(), dec("2.75"));
    }

    #[test]
    fn rejects_garbage_and_empty_input() {
        assert_eq!(
            normalize("abc", UnitOfMeasure::Kg),
            Err(QuantityError::NotNumeric("abc".to_string()))
        );
        assert_eq!(normalize("   ", UnitOfMeasure::Kg), Err(QuantityError::Missing));
    }

    #[test]
    fn rejects_magnitudes_beyond_column_range() {
        assert_eq!(
            normalize("99999999999", UnitOfMeasure::Unidad).unwrap().value(),
            dec("99999999999")
        );
        assert_eq!(
            normalize("99999999999.999", UnitOfMeasure::Kg).unwrap().value(),
            dec("99999999999.999")
        );
        assert!(matches!(
            normalize("100000000000", UnitOfMeasure::Unidad),
            Err(QuantityError::OutOfRange(_))
        ));
        assert!(matches!(
            normalize("-1e12", UnitOfMeasure::Kg),
            Err(QuantityError::OutOfRange(_))
        ));
        assert!(matches!(
            normalize("79228162514264337593543950335", UnitOfMeasure::Unidad),
            Err(QuantityError::OutOfRange(_))
        ));
    }

    #[test]
    fn scientific_notation_is_parsed() {
        assert_eq!(parse_decimal("1e3").unwrap(), dec("1000"));
    }

    #[test]
    fn formats_quantities() {
        assert_eq!(format_quantity(dec("2.5"), UnitOfMeasure::Kg), "2.5");
        assert_eq!(format_quantity(dec("2.500"), UnitOfMeasure::Kg), "2.5");
        assert_eq!(format_quantity(dec("4.000"), UnitOfMeasure::Kg), "4");
        assert_eq!(format_quantity(dec("3"), UnitOfMeasure::Unidad), "3");
        assert_eq!(format_quantity(dec("10"), UnitOfMeasure::Unidad), "10");
        assert_eq!(format_quantity(Decimal::ZERO, UnitOfMeasure::Kg), "0");
        assert_eq!(format_quantity(dec("0.000"), UnitOfMeasure::Kg), "0");
    }

    #[test]
    fn formats_signed_deltas() {
        assert_eq!(format_signed(dec("-4"), UnitOfMeasure::Unidad), "-4");
        assert_eq!(format_signed(dec("3"), UnitOfMeasure::Unidad), "+3");
        assert_eq!(format_signed(dec("2.750"), UnitOfMeasure::Kg), "+2.75");
        assert_eq!(format_signed(Decimal::ZERO, UnitOfMeasure::Kg), "0");
        assert_eq!(format_signed(dec("-0.0001"), UnitOfMeasure::Kg), "0");
    }

    #[test]
    fn unit_round_trips_through_text() {
        assert_eq!("KG".parse::<UnitOfMeasure>().unwrap(), UnitOfMeasure::Kg);
        assert_eq!(UnitOfMeasure::Unidad.to_string(), "unidad");
        assert!("litro".parse::<UnitOfMeasure>().is_err());
    }
}
