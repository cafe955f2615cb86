//! Leitner API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateLeitnerRequest, Leitner, UpdateLeitnerRequest};
use crate::AppState;

/// GET /api/leitners - List all leitners.
pub async fn list_leitners(State(state): State<AppState>) -> ApiResult<Vec<Leitner>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_leitners().await {
        Ok(leitners) => success(leitners, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/leitners/:id - Get a single leitner.
pub async fn get_leitner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Leitner> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_leitner(&id).await {
        Ok(Some(leitner)) => success(leitner, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Leitner {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/leitners - Create a new leitner with its level plan.
pub async fn create_leitner(
    State(state): State<AppState>,
    Json(request): Json<CreateLeitnerRequest>,
) -> ApiResult<Leitner> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Leitner name is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_leitner(&request).await {
        Ok(leitner) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(leitner, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/leitners/:id - Update a leitner.
pub async fn update_leitner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeitnerRequest>,
) -> ApiResult<Leitner> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return error(
                AppError::Validation("Leitner name cannot be empty".to_string()),
                revision_id,
            );
        }
    }

    match state.repo.update_leitner(&id, &request).await {
        Ok(leitner) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(leitner, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/leitners/:id - Delete a leitner and everything it owns.
pub async fn delete_leitner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_leitner(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
