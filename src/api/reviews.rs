//! Review session API endpoints.
//!
//! Sessions live in memory inside [`AppState`]; each card's pass/fail is
//! persisted through the repository transaction before the session
//! advances, so an abandoned session never leaves half-applied state
//! behind.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::scheduling::{self, ReviewOutcome};
use crate::session::{ReviewSession, SessionState};
use crate::AppState;

/// Request body for starting a review session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReviewRequest {
    pub level_id: String,
}

/// The current question as presented to the client. The answer text is
/// withheld until the session reveals it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuestionView {
    pub id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub level_number: i64,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Wire representation of one review session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    pub id: String,
    pub level_id: String,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<ReviewQuestionView>,
    pub pass_count: usize,
    pub fail_count: usize,
    pub reviewed_count: usize,
    pub total_count: usize,
    pub remaining_count: usize,
}

fn snapshot(id: &str, session: &ReviewSession) -> ReviewSnapshot {
    let current_question = session.current().map(|q| ReviewQuestionView {
        id: q.id.clone(),
        question: q.question.clone(),
        detail: q.detail.clone(),
        level_number: q.level_number,
        favorite: q.favorite,
        answer: (session.state() == SessionState::AnswerShown).then(|| q.answer.clone()),
    });

    ReviewSnapshot {
        id: id.to_string(),
        level_id: session.level_id().to_string(),
        state: session.state(),
        current_question,
        pass_count: session.pass_count(),
        fail_count: session.fail_count(),
        reviewed_count: session.reviewed_count(),
        total_count: session.total_count(),
        remaining_count: session.remaining_count(),
    }
}

/// POST /api/reviews - Start a review session over a level's due
/// questions. The due set is snapshotted once and stays fixed for the
/// session's lifetime.
pub async fn start_review(
    State(state): State<AppState>,
    Json(request): Json<StartReviewRequest>,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let level = match state.repo.get_level(&request.level_id).await {
        Ok(Some(level)) => level,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Level {} not found", request.level_id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    let questions = match state.repo.questions_in_level(&level.id).await {
        Ok(questions) => questions,
        Err(e) => return error(e, revision_id),
    };

    let now = Utc::now();
    let due: Vec<_> = questions
        .into_iter()
        .filter(|q| scheduling::is_reviewable(q, level.days_to_recommend, now))
        .collect();

    let session = ReviewSession::new(level.id.clone(), due);
    let id = uuid::Uuid::new_v4().to_string();

    let mut sessions = state.sessions.lock().await;
    let body = snapshot(&id, &session);
    sessions.insert(id, session);

    success(body, revision_id)
}

/// GET /api/reviews/:id - Get the current session state.
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let sessions = state.sessions.lock().await;
    match sessions.get(&id) {
        Some(session) => success(snapshot(&id, session), revision_id),
        None => error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        ),
    }
}

/// POST /api/reviews/:id/reveal - Reveal the current answer.
pub async fn reveal_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut sessions = state.sessions.lock().await;
    let Some(session) = sessions.get_mut(&id) else {
        return error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        );
    };

    match session.reveal_answer() {
        Ok(()) => success(snapshot(&id, session), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/reviews/:id/hide - Hide the current answer again.
pub async fn hide_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut sessions = state.sessions.lock().await;
    let Some(session) = sessions.get_mut(&id) else {
        return error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        );
    };

    match session.hide_answer() {
        Ok(()) => success(snapshot(&id, session), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/reviews/:id/pass - Pass the current question.
pub async fn pass_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    apply_outcome(state, id, ReviewOutcome::Passed).await
}

/// POST /api/reviews/:id/fail - Fail the current question.
pub async fn fail_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    apply_outcome(state, id, ReviewOutcome::Failed).await
}

/// Persist the outcome for the current card, then advance. The session
/// position only moves once the store write has committed; a store
/// failure is surfaced and the card stays current.
async fn apply_outcome(
    state: AppState,
    id: String,
    outcome: ReviewOutcome,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut sessions = state.sessions.lock().await;
    let Some(session) = sessions.get_mut(&id) else {
        return error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        );
    };

    let Some(current) = session.current() else {
        return error(
            AppError::BadRequest("Review session is already finished".to_string()),
            revision_id,
        );
    };
    let question_id = current.id.clone();

    match state
        .repo
        .apply_review(&question_id, outcome, Utc::now())
        .await
    {
        Ok(_) => {
            if let Err(e) = session.advance(outcome) {
                return error(e, revision_id);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(snapshot(&id, session), new_revision)
        }
        Err(AppError::NotFound(msg)) => {
            // The card vanished from the store mid-session; drop it from
            // the remaining sequence so the session can continue.
            let _ = session.remove_current();
            error(AppError::NotFound(msg), revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/reviews/:id/question - Delete the current question from
/// the store and drop it from the session sequence.
pub async fn delete_current_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReviewSnapshot> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut sessions = state.sessions.lock().await;
    let Some(session) = sessions.get_mut(&id) else {
        return error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        );
    };

    let Some(current) = session.current() else {
        return error(
            AppError::BadRequest("Review session is already finished".to_string()),
            revision_id,
        );
    };
    let question_id = current.id.clone();

    match state.repo.delete_question(&question_id).await {
        // Already-gone counts as deleted; the sequence moves on either way.
        Ok(()) | Err(AppError::NotFound(_)) => {
            if let Err(e) = session.remove_current() {
                return error(e, revision_id);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(snapshot(&id, session), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/reviews/:id - Abandon a session. Transitions already
/// applied to processed cards stay committed.
pub async fn abandon_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mut sessions = state.sessions.lock().await;
    match sessions.remove(&id) {
        Some(_) => success((), revision_id),
        None => error(
            AppError::NotFound(format!("Review session {} not found", id)),
            revision_id,
        ),
    }
}
