//! Error handling for the inventory ledger service
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::MovementRejection;
use thiserror::Error;
use uuid::Uuid;

/// PostgreSQL error codes the ledger reacts to
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_CHECK_VIOLATION: &str = "23514";
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_es: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    // Ledger errors
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Quantity {0} is not a whole number of units")]
    QuantityNotIntegral(Decimal),

    #[error("Quantity must be greater than zero")]
    ZeroQuantity,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Adjustment of {delta} would leave stock below zero (current {current})")]
    NegativeResultingStock { current: Decimal, delta: Decimal },

    // Concurrency errors
    /// The cached stock moved between read and write; the commit may be retried
    #[error("Stock changed concurrently")]
    StockConflict,

    #[error("Busy: {0}")]
    Busy(String),

    // Storage errors
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a commit that failed with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StockConflict)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let (code, constraint) = match &err {
            sqlx::Error::Database(db) => (
                db.code().map(|c| c.to_string()),
                db.constraint().map(str::to_string),
            ),
            _ => (None, None),
        };

        if matches!(
            err,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
        ) {
            return AppError::Unavailable(err.to_string());
        }

        match code.as_deref() {
            Some(PG_SERIALIZATION_FAILURE | PG_DEADLOCK_DETECTED | PG_LOCK_NOT_AVAILABLE) => {
                AppError::StockConflict
            }
            // product code is the only unique business key
            Some(PG_UNIQUE_VIOLATION) => AppError::DuplicateEntry("code".to_string()),
            Some(PG_CHECK_VIOLATION) => AppError::Internal(format!(
                "Ledger constraint violated: {}",
                constraint.as_deref().unwrap_or("unknown")
            )),
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<MovementRejection> for AppError {
    fn from(rejection: MovementRejection) -> Self {
        match rejection {
            MovementRejection::Invalid(msg) => AppError::ValidationError(msg),
            MovementRejection::QuantityNotIntegral { quantity } => {
                AppError::QuantityNotIntegral(quantity)
            }
            MovementRejection::ZeroQuantity => AppError::ZeroQuantity,
            MovementRejection::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            MovementRejection::NegativeResultingStock { current, delta } => {
                AppError::NegativeResultingStock { current, delta }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_es: format!("Datos inválidos en el campo {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_es: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_es: message_es.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired", "La sesión ha expirado"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "Token inválido"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    "No tiene permisos para realizar esta acción",
                ),
            ),
            AppError::Unauthorized {
                message,
                message_es,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_es.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_es.clone())
                    .with_field(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "VALIDATION_ERROR",
                    msg.clone(),
                    format!("Datos inválidos: {}", msg),
                ),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                    format!("Ya existe un registro con este {}", field),
                )
                .with_field(field.clone()),
            ),
            AppError::ProductNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "PRODUCT_NOT_FOUND",
                    format!("Product {} not found or inactive", id),
                    "Producto no encontrado o inactivo",
                )
                .with_field("product_id"),
            ),
            AppError::QuantityNotIntegral(quantity) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "QUANTITY_NOT_INTEGRAL",
                    format!("Quantity {} must be a whole number for this product", quantity),
                    format!("La cantidad {} debe ser un número entero para este producto", quantity),
                )
                .with_field("quantity"),
            ),
            AppError::ZeroQuantity => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "ZERO_QUANTITY",
                    "Quantity must be greater than zero",
                    "La cantidad debe ser mayor a cero",
                )
                .with_field("quantity"),
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!(
                        "Insufficient stock: requested {}, available {}",
                        requested.normalize(),
                        available.normalize()
                    ),
                    format!(
                        "Stock insuficiente: solicitado {}, disponible {}",
                        requested.normalize(),
                        available.normalize()
                    ),
                )
                .with_field("quantity"),
            ),
            AppError::NegativeResultingStock { current, delta } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "NEGATIVE_RESULTING_STOCK",
                    format!(
                        "Adjustment of {} would leave stock below zero (current {})",
                        delta.normalize(),
                        current.normalize()
                    ),
                    format!(
                        "El ajuste de {} dejaría el stock en negativo (actual {})",
                        delta.normalize(),
                        current.normalize()
                    ),
                )
                .with_field("quantity"),
            ),
            AppError::StockConflict | AppError::Busy(_) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "BUSY",
                    "The product is being updated by another request, please retry",
                    "El producto está siendo actualizado, intente nuevamente",
                ),
            ),
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "UNAVAILABLE",
                    "Storage is temporarily unavailable",
                    "El almacenamiento no está disponible temporalmente",
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "Ocurrió un error en la base de datos",
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "CONFIGURATION_ERROR",
                    format!("Configuration error: {}", msg),
                    format!("Error de configuración: {}", msg),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "Error interno del servidor",
                ),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_ledger_errors() {
        let err: AppError = MovementRejection::ZeroQuantity.into();
        assert!(matches!(err, AppError::ZeroQuantity));

        let err: AppError = MovementRejection::InsufficientStock {
            available: Decimal::from(5),
            requested: Decimal::from(10),
        }
        .into();
        assert!(matches!(err, AppError::InsufficientStock { .. }));

        let err: AppError = MovementRejection::Invalid("quantity is required".into()).into();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn status_codes_per_kind() {
        let cases = [
            (AppError::ProductNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (AppError::ZeroQuantity, StatusCode::BAD_REQUEST),
            (
                AppError::QuantityNotIntegral(Decimal::new(15, 1)),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NegativeResultingStock {
                    current: Decimal::from(2),
                    delta: Decimal::from(-5),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::Busy("retry".into()), StatusCode::CONFLICT),
            (
                AppError::Unavailable("pool timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn pool_timeouts_are_unavailable() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(!err.is_retryable());
        assert!(AppError::StockConflict.is_retryable());
    }
}
