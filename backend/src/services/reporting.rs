//! Movement audit export

use serde::Serialize;
use shared::{format_quantity, MovementWithProduct};

use crate::error::{AppError, AppResult};

/// One CSV line of the movement audit
#[derive(Debug, Serialize)]
pub struct MovementCsvRow {
    pub id: i64,
    pub created_at: String,
    pub product_code: String,
    pub product_name: String,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantity: String,
    pub stock_before: String,
    pub stock_after: String,
    pub unit: String,
    pub notes: String,
    pub created_by: String,
}

impl From<&MovementWithProduct> for MovementCsvRow {
    fn from(row: &MovementWithProduct) -> Self {
        let m = &row.movement;
        Self {
            id: m.id,
            created_at: m.created_at.to_rfc3339(),
            product_code: row.product_code.clone(),
            product_name: row.product_name.clone(),
            movement_type: m.movement_type.as_str().to_string(),
            quantity: row.quantity_display(),
            stock_before: format_quantity(m.stock_before, row.unit),
            stock_after: format_quantity(m.stock_after, row.unit),
            unit: row.unit.as_str().to_string(),
            notes: m.notes.clone().unwrap_or_default(),
            created_by: m.created_by.map(|u| u.to_string()).unwrap_or_default(),
        }
    }
}

pub struct ReportingService;

impl ReportingService {
    /// Render audit rows as CSV with a header line
    pub fn movements_csv(rows: &[MovementWithProduct]) -> AppResult<String> {
        let records: Vec<MovementCsvRow> = rows.iter().map(MovementCsvRow::from).collect();
        Self::export_to_csv(&records)
    }

    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::{MovementType, StockMovement, UnitOfMeasure};
    use uuid::Uuid;

    #[test]
    fn csv_has_header_and_signed_quantities() {
        let row = MovementWithProduct {
            movement: StockMovement {
                id: 7,
                product_id: Uuid::new_v4(),
                movement_type: MovementType::Salida,
                quantity: Decimal::new(-25, 1),
                stock_before: Decimal::new(10, 0),
                stock_after: Decimal::new(75, 1),
                notes: Some("venta, mostrador".to_string()),
                created_by: None,
                created_at: Utc::now(),
            },
            product_name: "Proteína".to_string(),
            product_code: "PROT-1KG".to_string(),
            unit: UnitOfMeasure::Kg,
        };

        let csv = ReportingService::movements_csv(&[row]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,created_at,product_code,product_name,type,quantity,stock_before,stock_after,unit,notes,created_by")
        );
        let line = lines.next().unwrap();
        assert!(line.starts_with("7,"));
        assert!(line.contains(",salida,-2.5,10,7.5,kg,"));
        assert!(line.contains("\"venta, mostrador\""));
    }

    #[test]
    fn empty_export_is_empty() {
        let csv = ReportingService::movements_csv(&[]).unwrap();
        assert!(csv.is_empty());
    }
}
