//! Decision log handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use tagwise_core::models::{DecisionRecord, DecisionStats};

/// Query parameters for listing decisions
#[derive(Debug, Deserialize)]
pub struct DecisionQuery {
    pub limit: Option<i64>,
}

/// GET /api/decisions - Most recent review decisions
pub async fn list_decisions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DecisionQuery>,
) -> Result<Json<Vec<DecisionRecord>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_decisions(limit)?))
}

/// GET /api/decisions/stats - Decision counts by kind
pub async fn get_decision_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DecisionStats>, AppError> {
    Ok(Json(state.db.decision_stats()?))
}
