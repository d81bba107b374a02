//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use tagwise_core::models::Category;

/// GET /api/categories - List all categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.db.list_categories()?))
}

/// Request body for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    if state.db.get_category_by_name(&req.name)?.is_some() {
        return Err(AppError::conflict("Category already exists"));
    }

    let id = state.db.create_category(&req.name, req.color.as_deref())?;
    let category = state
        .db
        .get_category(id)?
        .ok_or_else(|| AppError::internal("Category vanished after insert"))?;

    info!(id, name = %category.name, "Created category");
    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a category
///
/// Learned patterns are kept; suggestions for the category stop appearing.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_category(id)?;
    Ok(Json(SuccessResponse { success: true }))
}
