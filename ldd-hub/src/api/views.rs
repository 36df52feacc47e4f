//! Read-only dashboard views

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::aggregate::TotalsView;
use crate::error::{HubError, HubResult};
use crate::model::Reading;
use crate::trend::{DailyTrend, WeeklyHistory};
use crate::AppState;

/// Query parameters for the history view
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Rows to return (capped server side)
    pub limit: Option<u32>,
}

/// GET /api/totals
pub async fn get_totals(State(state): State<AppState>) -> HubResult<Json<TotalsView>> {
    Ok(Json(state.hub.totals().await?))
}

/// GET /api/trend/daily
pub async fn get_daily_trend(State(state): State<AppState>) -> HubResult<Json<DailyTrend>> {
    Ok(Json(state.hub.daily_trend().await?))
}

/// GET /api/trend/weekly
pub async fn get_weekly_history(State(state): State<AppState>) -> HubResult<Json<WeeklyHistory>> {
    Ok(Json(state.hub.weekly_history().await?))
}

/// GET /api/history?limit=N
///
/// A malformed query string is reported with the same JSON error body as
/// every other endpoint.
pub async fn get_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> HubResult<Json<Vec<Reading>>> {
    let Query(query) = query.map_err(|e| HubError::InvalidPayload(e.body_text()))?;
    Ok(Json(state.hub.history(query.limit).await?))
}
