//! Synonym API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{LinkSynonymsRequest, SynonymGroup};
use crate::AppState;

/// GET /api/leitners/:id/synonyms - List the synonym groups touching a
/// leitner.
pub async fn list_synonym_groups(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
) -> ApiResult<Vec<SynonymGroup>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_synonym_groups(&leitner_id).await {
        Ok(groups) => success(groups, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/questions/:id/synonyms - Get the group a question belongs to.
pub async fn get_synonym_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Option<SynonymGroup>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.synonym_group_of(&id).await {
        Ok(group) => success(group, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/synonyms - Link two questions as synonyms, merging their
/// existing groups when both already have one.
pub async fn link_synonyms(
    State(state): State<AppState>,
    Json(request): Json<LinkSynonymsRequest>,
) -> ApiResult<SynonymGroup> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .link_synonyms(&request.question_id, &request.other_question_id)
        .await
    {
        Ok(group) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(group, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/questions/:id/synonyms - Detach a question from its
/// synonym group.
pub async fn unlink_synonyms(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.unlink_synonyms(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
