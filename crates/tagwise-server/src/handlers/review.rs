//! Review session handlers
//!
//! The server keeps one review session. Loading a new batch replaces it.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState};
use tagwise_core::{
    import::parse_csv,
    models::{
        DecisionOutcome, ImportedTransaction, ReviewCandidate, ReviewSummary, SessionState,
    },
    ReviewQueue,
};

/// Request body for loading a review batch
///
/// Exactly one of `csv` (a bank export) or `transactions` must be given.
#[derive(Debug, Deserialize)]
pub struct LoadReviewRequest {
    pub csv: Option<String>,
    pub transactions: Option<Vec<ImportedTransaction>>,
}

/// Review session status
#[derive(Debug, Serialize)]
pub struct ReviewStatusResponse {
    pub session: SessionState,
    pub summary: ReviewSummary,
    pub current: Option<ReviewCandidate>,
}

impl ReviewStatusResponse {
    fn from_queue(queue: &ReviewQueue) -> Self {
        Self {
            session: queue.state(),
            summary: queue.summary(),
            current: queue.current().cloned(),
        }
    }
}

/// POST /api/review - Load a batch and start a new session
pub async fn load_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadReviewRequest>,
) -> Result<Json<ReviewStatusResponse>, AppError> {
    let transactions = match (req.csv, req.transactions) {
        (Some(csv), None) => parse_csv(csv.as_bytes())?,
        (None, Some(transactions)) => transactions,
        _ => {
            return Err(AppError::bad_request(
                "Provide either 'csv' or 'transactions'",
            ))
        }
    };

    let mut queue = state.review()?;
    queue.load_batch(transactions)?;
    Ok(Json(ReviewStatusResponse::from_queue(&queue)))
}

/// GET /api/review - Session state, progress and current candidate
pub async fn get_review(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReviewStatusResponse>, AppError> {
    let queue = state.review()?;
    Ok(Json(ReviewStatusResponse::from_queue(&queue)))
}

/// GET /api/review/current - The candidate awaiting a decision
pub async fn get_current_candidate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReviewCandidate>, AppError> {
    let queue = state.review()?;
    let candidate = queue
        .current()
        .cloned()
        .ok_or_else(|| AppError::not_found("No pending review candidate"))?;
    Ok(Json(candidate))
}

/// GET /api/review/candidates - Every candidate in batch order
pub async fn list_candidates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReviewCandidate>>, AppError> {
    let queue = state.review()?;
    Ok(Json(queue.candidates().to_vec()))
}

/// POST /api/review/accept - Accept the current suggestion
pub async fn accept_candidate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let mut queue = state.review()?;
    Ok(Json(queue.accept()?))
}

/// POST /api/review/reject - Reject the current suggestion
pub async fn reject_candidate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let mut queue = state.review()?;
    Ok(Json(queue.reject()?))
}

/// Request body for manual classification
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub category_id: i64,
    /// Classify an already-rejected candidate instead of the current one
    pub position: Option<usize>,
}

/// POST /api/review/classify - Assign a category by hand
pub async fn classify_candidate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<DecisionOutcome>, AppError> {
    let mut queue = state.review()?;
    let outcome = match req.position {
        Some(position) => queue.classify_rejected(position, req.category_id)?,
        None => queue.classify_manually(req.category_id)?,
    };
    Ok(Json(outcome))
}

/// POST /api/review/defer - Move the current candidate to the back
pub async fn defer_candidate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReviewStatusResponse>, AppError> {
    let mut queue = state.review()?;
    queue.defer();
    Ok(Json(ReviewStatusResponse::from_queue(&queue)))
}
