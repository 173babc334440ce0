//! HTTP handlers for stock movements, alerts and reconciliation

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{
    AlertFilter, AlertSummary, AlertTypeFilter, MovementFilter, MovementPreview, MovementRequest,
    MovementType, MovementWithProduct, StockMovement,
};

use crate::error::{AppError, AppResult};
use crate::middleware::{check_permission, CurrentUser, INVENTORY_WRITE};
use crate::services::{ReconciliationReport, ReportingService};
use crate::AppState;

/// Query parameters for the alerts view
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
}

/// Query parameters for the movement audit
#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub limit: Option<u32>,
    pub format: Option<String>, // "json" or "csv"
}

impl TryFrom<AlertQuery> for AlertFilter {
    type Error = AppError;

    fn try_from(query: AlertQuery) -> Result<Self, Self::Error> {
        let alert_type = query
            .alert_type
            .as_deref()
            .unwrap_or("")
            .parse::<AlertTypeFilter>()
            .map_err(|msg| AppError::Validation {
                field: "type".to_string(),
                message: msg,
                message_es: "Tipo de alerta desconocido".to_string(),
            })?;

        Ok(AlertFilter {
            search: query.search,
            category: query.category,
            alert_type,
        })
    }
}

impl MovementQuery {
    fn filter(&self) -> AppResult<MovementFilter> {
        let movement_type = match self.movement_type.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<MovementType>()?),
        };
        Ok(MovementFilter {
            search: self.search.clone(),
            movement_type,
            limit: self.limit,
        })
    }

    fn wants_csv(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("csv"))
    }
}

/// Submit a stock movement
pub async fn submit_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<MovementRequest>,
) -> AppResult<Json<StockMovement>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let movement = state
        .movement_service()
        .submit_movement(request, Some(current_user.0.user_id))
        .await?;
    Ok(Json(movement))
}

/// Preview the effect of a movement without committing it
pub async fn preview_movement(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(request): Json<MovementRequest>,
) -> AppResult<Json<MovementPreview>> {
    let preview = state.movement_service().preview(&request).await?;
    Ok(Json(preview))
}

/// Global movement audit, as JSON or CSV
pub async fn list_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Response> {
    let filter = query.filter()?;
    let rows: Vec<MovementWithProduct> = state.ledger().all_movements(&filter).await?;

    if query.wants_csv() {
        let csv = ReportingService::movements_csv(&rows)?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"movimientos.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(rows).into_response())
}

/// Alert counters and items
pub async fn get_alerts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<AlertQuery>,
) -> AppResult<Json<AlertSummary>> {
    let filter = AlertFilter::try_from(query)?;
    let summary = state.alert_service().summary(&filter).await?;
    Ok(Json(summary))
}

/// Replay the ledger for every product and repair cached stock
pub async fn reconcile_all(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ReconciliationReport>>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let reports = state.ledger().reconcile_all().await?;
    Ok(Json(reports))
}
