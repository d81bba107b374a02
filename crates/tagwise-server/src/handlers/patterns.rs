//! Learned pattern and metrics handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use tagwise_core::{
    compute_metrics,
    models::{ClassificationMetrics, ClassificationPattern},
};

/// Query parameters for listing patterns
#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    pub category_id: Option<i64>,
    /// Only patterns at or above this confidence
    pub min_confidence: Option<f64>,
}

/// GET /api/patterns - List learned patterns, strongest first
pub async fn list_patterns(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PatternQuery>,
) -> Result<Json<Vec<ClassificationPattern>>, AppError> {
    let mut patterns: Vec<ClassificationPattern> = state
        .store
        .snapshot()
        .into_iter()
        .filter(|p| params.category_id.map_or(true, |id| p.category_id == id))
        .filter(|p| params.min_confidence.map_or(true, |min| p.confidence >= min))
        .collect();

    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| a.pattern_text.cmp(&b.pattern_text))
    });

    Ok(Json(patterns))
}

/// GET /api/metrics - Summary statistics over learned patterns
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClassificationMetrics>, AppError> {
    let config = state.store.config();
    Ok(Json(compute_metrics(
        &state.store.snapshot(),
        config.activity_threshold,
        config.top_patterns,
    )))
}
