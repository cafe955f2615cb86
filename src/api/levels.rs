//! Level API endpoints.
//!
//! The level listing carries the due/not-due partition for progress
//! display; the instant it is evaluated against is captured once for the
//! whole listing so eligibility cannot flicker between rows.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateLevelRequest, Level, LevelOverview, UpdateLevelRequest};
use crate::scheduling;
use crate::AppState;

/// GET /api/leitners/:id/levels - List a leitner's levels with their
/// reviewable/not-reviewable partitions.
pub async fn list_levels(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
) -> ApiResult<Vec<LevelOverview>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_leitner(&leitner_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Leitner {} not found", leitner_id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    let levels = match state.repo.list_levels(&leitner_id).await {
        Ok(levels) => levels,
        Err(e) => return error(e, revision_id),
    };

    let now = Utc::now();
    let mut overviews = Vec::with_capacity(levels.len());
    for level in levels {
        let questions = match state.repo.questions_in_level(&level.id).await {
            Ok(questions) => questions,
            Err(e) => return error(e, revision_id),
        };
        let (reviewable, not_reviewable) =
            scheduling::partition_reviewable(&questions, level.days_to_recommend, now);
        let favorite_count = questions.iter().filter(|q| q.favorite).count();

        overviews.push(LevelOverview {
            level,
            question_count: questions.len(),
            reviewable_count: reviewable,
            not_reviewable_count: not_reviewable,
            favorite_count,
        });
    }

    success(overviews, revision_id)
}

/// POST /api/leitners/:id/levels - Add a level to a leitner.
pub async fn create_level(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
    Json(request): Json<CreateLevelRequest>,
) -> ApiResult<Level> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_level(&leitner_id, &request).await {
        Ok(level) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(level, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/levels/:id - Change a level's review interval.
pub async fn update_level(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLevelRequest>,
) -> ApiResult<Level> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .set_days_to_recommend(&id, request.days_to_recommend)
        .await
    {
        Ok(level) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(level, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
