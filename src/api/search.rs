//! Search API endpoints.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::Question;
use crate::search;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
}

/// Search result with questions and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<Question>,
    pub total: usize,
}

/// GET /api/leitners/:id/search - Search a leitner's questions.
///
/// Queries shorter than two characters return an empty result set;
/// matches are capped at twenty, ranked by matched field.
pub async fn search_questions(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
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

    let questions = match state.repo.list_questions(&leitner_id).await {
        Ok(questions) => questions,
        Err(e) => return error(e, revision_id),
    };

    let results = search::search_questions(&questions, &params.q);
    let total = results.len();

    success(SearchResponse { results, total }, revision_id)
}
