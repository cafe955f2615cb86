//! Question API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AttachTagRequest, CreateQuestionRequest, MoveQuestionRequest, Question, Tag,
    UpdateQuestionRequest,
};
use crate::search::{self, SortKey};
use crate::AppState;

/// Query parameters for question listings.
#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    /// Optional sort key (level, completed, alphabet, favorite, date).
    #[serde(default)]
    pub sort: Option<SortKey>,
}

/// GET /api/leitners/:id/questions - List a leitner's questions,
/// optionally sorted.
pub async fn list_questions(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
    Query(params): Query<ListQuestionsQuery>,
) -> ApiResult<Vec<Question>> {
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

    match state.repo.list_questions(&leitner_id).await {
        Ok(mut questions) => {
            if let Some(key) = params.sort {
                search::sort_questions(&mut questions, key);
            }
            success(questions, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/leitners/:id/questions - Create a new question at level 1.
pub async fn create_question(
    State(state): State<AppState>,
    Path(leitner_id): Path<String>,
    Json(request): Json<CreateQuestionRequest>,
) -> ApiResult<Question> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.question.trim().is_empty() {
        return error(
            AppError::Validation("Question text is required".to_string()),
            revision_id,
        );
    }
    if request.answer.trim().is_empty() {
        return error(
            AppError::Validation("Answer text is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_question(&leitner_id, &request).await {
        Ok(question) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(question, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/questions/:id - Get a single question.
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Question> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_question(&id).await {
        Ok(Some(question)) => success(question, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Question {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/questions/:id - Update a question.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuestionRequest>,
) -> ApiResult<Question> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_question(&id, &request).await {
        Ok(question) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(question, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/questions/:id - Delete a question.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_question(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/questions/:id/reset - Reset a question to level 1.
pub async fn reset_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Question> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.reset_question(&id).await {
        Ok(question) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(question, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/questions/:id/move - Move a question to another leitner.
/// The question re-enters at level 1 of the destination.
pub async fn move_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MoveQuestionRequest>,
) -> ApiResult<Question> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .move_question(&id, &request.target_leitner_id)
        .await
    {
        Ok(question) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(question, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/questions/:id/tags - List the tags attached to a question.
pub async fn list_question_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Tag>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_question(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Question {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.tags_for_question(&id).await {
        Ok(tags) => success(tags, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/questions/:id/tags - Attach a tag to a question.
pub async fn attach_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AttachTagRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.attach_tag(&id, &request.tag_id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/questions/:id/tags/:tag_id - Detach a tag from a question.
pub async fn detach_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.detach_tag(&id, &tag_id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
