//! Suggestion handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_SUGGEST_BATCH};
use tagwise_core::{models::ClassificationSuggestion, normalize, SuggestionEngine};

/// Request body for suggestions
#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub descriptions: Vec<String>,
}

/// One suggestion result, in request order
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub description: String,
    pub normalized: String,
    pub suggestion: Option<ClassificationSuggestion>,
}

/// POST /api/suggest - Suggest categories for raw descriptions
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SuggestRequest>,
) -> Result<Json<Vec<SuggestResponse>>, AppError> {
    if req.descriptions.len() > MAX_SUGGEST_BATCH {
        return Err(AppError::bad_request(&format!(
            "At most {} descriptions per request",
            MAX_SUGGEST_BATCH
        )));
    }

    let engine = SuggestionEngine::new(&state.store).with_directory(&*state.db);
    let suggestions = engine.suggest_batch(&req.descriptions)?;

    let results = req
        .descriptions
        .into_iter()
        .zip(suggestions)
        .map(|(description, suggestion)| SuggestResponse {
            normalized: normalize(&description),
            description,
            suggestion,
        })
        .collect();

    Ok(Json(results))
}
