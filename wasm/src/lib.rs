//! WebAssembly module for the gym console inventory
//!
//! Gives the console dialogs the same quantity rules the server applies:
//! - Quantity formatting per unit
//! - Movement previews (delta and resulting stock)
//! - Alert tier classification
//!
//! Decimal values cross the boundary as strings so no precision is lost.

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::{
    format_quantity as format_for_unit, format_signed, parse_decimal, preview, AlertThresholds,
    MovementType, UnitOfMeasure,
};

fn parse_unit(unit: &str) -> Result<UnitOfMeasure, String> {
    unit.parse().map_err(|e: shared::QuantityError| e.to_string())
}

fn parse_value(raw: &str) -> Result<Decimal, String> {
    parse_decimal(raw).map_err(|e| e.to_string())
}

fn format_inner(value: &str, unit: &str) -> Result<String, String> {
    Ok(format_for_unit(parse_value(value)?, parse_unit(unit)?))
}

fn format_signed_inner(delta: &str, unit: &str) -> Result<String, String> {
    Ok(format_signed(parse_value(delta)?, parse_unit(unit)?))
}

fn preview_inner(
    current_stock: &str,
    unit: &str,
    movement_type: &str,
    quantity: &str,
) -> Result<String, String> {
    let current = parse_value(current_stock)?;
    let unit = parse_unit(unit)?;
    let movement_type: MovementType = movement_type
        .parse()
        .map_err(|e: shared::MovementRejection| e.to_string())?;

    let result = preview(current, unit, movement_type, quantity);
    serde_json::to_string(&result).map_err(|e| e.to_string())
}

fn classify_inner(
    stock: &str,
    min_stock: &str,
    near_multiplier: Option<String>,
) -> Result<String, String> {
    let thresholds = match near_multiplier.as_deref() {
        Some(m) if !m.trim().is_empty() => AlertThresholds::new(parse_value(m)?)?,
        _ => AlertThresholds::default(),
    };
    Ok(thresholds
        .classify_stock(parse_value(stock)?, parse_value(min_stock)?)
        .map(|tag| tag.as_str().to_string())
        .unwrap_or_default())
}

fn to_js_error(message: String) -> JsValue {
    let err = JsValue::from_str(&message);
    web_sys::console::warn_1(&err);
    err
}

/// Render a stock value for its unit ("12", "1.25")
#[wasm_bindgen]
pub fn format_quantity(value: &str, unit: &str) -> Result<String, JsValue> {
    format_inner(value, unit).map_err(to_js_error)
}

/// Render a movement delta with its sign ("+3", "-0.5")
#[wasm_bindgen]
pub fn format_signed_quantity(delta: &str, unit: &str) -> Result<String, JsValue> {
    format_signed_inner(delta, unit).map_err(to_js_error)
}

/// Preview a movement; returns the preview as JSON
#[wasm_bindgen]
pub fn preview_movement(
    current_stock: &str,
    unit: &str,
    movement_type: &str,
    quantity: &str,
) -> Result<String, JsValue> {
    preview_inner(current_stock, unit, movement_type, quantity).map_err(to_js_error)
}

/// Preview a movement as a plain JS object
#[wasm_bindgen]
pub fn preview_movement_object(
    current_stock: &str,
    unit: &str,
    movement_type: &str,
    quantity: &str,
) -> Result<JsValue, JsValue> {
    let json = preview_inner(current_stock, unit, movement_type, quantity).map_err(to_js_error)?;
    js_sys::JSON::parse(&json)
}

/// Alert tier for a stock level: "out", "low", "near" or "" when healthy
#[wasm_bindgen]
pub fn classify_stock_alert(
    stock: &str,
    min_stock: &str,
    near_multiplier: Option<String>,
) -> Result<String, JsValue> {
    classify_inner(stock, min_stock, near_multiplier).map_err(to_js_error)
}
