//! Review session controller.
//!
//! Drives one study pass over a level's due questions. The sequence is
//! snapshotted at session start and never re-fetched, so a card that was
//! answered and moved to another level cannot reappear through a live
//! requery. Persistence happens outside this module: the host applies
//! each pass/fail through the store first and only then advances the
//! session, so abandoning a session mid-way never needs a rollback.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::Question;
use crate::scheduling::ReviewOutcome;

/// Per-question presentation state of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// A question is presented with its answer withheld.
    AnswerHidden,
    /// The answer for the current question is revealed.
    AnswerShown,
    /// No questions remain.
    Finished,
}

/// One review session over a fixed due-question sequence.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    level_id: String,
    queue: Vec<Question>,
    position: usize,
    state: SessionState,
    pass_count: usize,
    fail_count: usize,
    total_count: usize,
}

impl ReviewSession {
    /// Start a session over the given due questions. The sequence is
    /// ordered by ascending pass time with never-passed cards first and
    /// stays fixed for the session's lifetime.
    pub fn new(level_id: String, mut due_questions: Vec<Question>) -> Self {
        due_questions.sort_by_key(|q| q.pass_time);
        let total_count = due_questions.len();
        let state = if due_questions.is_empty() {
            SessionState::Finished
        } else {
            SessionState::AnswerHidden
        };

        Self {
            level_id,
            queue: due_questions,
            position: 0,
            state,
            pass_count: 0,
            fail_count: 0,
            total_count,
        }
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// The question currently presented, if any.
    pub fn current(&self) -> Option<&Question> {
        if self.is_finished() {
            return None;
        }
        self.queue.get(self.position)
    }

    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    pub fn fail_count(&self) -> usize {
        self.fail_count
    }

    /// Cards processed so far (passed or failed).
    pub fn reviewed_count(&self) -> usize {
        self.pass_count + self.fail_count
    }

    /// Size of the original due-question sequence.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Questions still waiting, including the current one.
    pub fn remaining_count(&self) -> usize {
        self.queue.len().saturating_sub(self.position)
    }

    /// Reveal the current question's answer. Does not mutate question
    /// state.
    pub fn reveal_answer(&mut self) -> Result<(), AppError> {
        if self.is_finished() {
            return Err(AppError::BadRequest(
                "Review session is already finished".to_string(),
            ));
        }
        self.state = SessionState::AnswerShown;
        Ok(())
    }

    /// Hide the current question's answer again.
    pub fn hide_answer(&mut self) -> Result<(), AppError> {
        if self.is_finished() {
            return Err(AppError::BadRequest(
                "Review session is already finished".to_string(),
            ));
        }
        self.state = SessionState::AnswerHidden;
        Ok(())
    }

    /// Record the outcome for the current question and advance to the
    /// next one in the fixed sequence. The caller must have persisted
    /// the transition already; a session never re-orders or re-fetches.
    pub fn advance(&mut self, outcome: ReviewOutcome) -> Result<(), AppError> {
        if self.current().is_none() {
            return Err(AppError::BadRequest(
                "Review session has no current question".to_string(),
            ));
        }

        match outcome {
            ReviewOutcome::Passed => self.pass_count += 1,
            ReviewOutcome::Failed => self.fail_count += 1,
        }

        self.position += 1;
        self.state = if self.position >= self.queue.len() {
            SessionState::Finished
        } else {
            SessionState::AnswerHidden
        };
        Ok(())
    }

    /// Drop the current question from the remaining sequence without
    /// recording an outcome (the card was deleted). The session stays on
    /// whatever comes next.
    pub fn remove_current(&mut self) -> Result<Question, AppError> {
        if self.current().is_none() {
            return Err(AppError::BadRequest(
                "Review session has no current question".to_string(),
            ));
        }

        let removed = self.queue.remove(self.position);
        self.state = if self.position >= self.queue.len() {
            SessionState::Finished
        } else {
            SessionState::AnswerHidden
        };
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn question(id: &str, pass_time: Option<DateTime<Utc>>) -> Question {
        Question {
            id: id.to_string(),
            leitner_id: "leitner-1".to_string(),
            level_id: "level-1".to_string(),
            level_number: 1,
            question: format!("question {}", id),
            answer: format!("answer {}", id),
            detail: None,
            completed: false,
            favorite: false,
            pass_time,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_session_starts_finished() {
        let session = ReviewSession::new("level-1".to_string(), vec![]);
        assert!(session.is_finished());
        assert_eq!(session.total_count(), 0);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_sequence_orders_by_pass_time_nulls_first() {
        let session = ReviewSession::new(
            "level-1".to_string(),
            vec![
                question("b", Some(base() + Duration::days(2))),
                question("a", Some(base())),
                question("new", None),
            ],
        );

        assert_eq!(session.current().unwrap().id, "new");
        assert_eq!(session.total_count(), 3);
    }

    #[test]
    fn test_answer_toggle_does_not_advance() {
        let mut session =
            ReviewSession::new("level-1".to_string(), vec![question("a", None)]);

        assert_eq!(session.state(), SessionState::AnswerHidden);
        session.reveal_answer().unwrap();
        assert_eq!(session.state(), SessionState::AnswerShown);
        session.hide_answer().unwrap();
        assert_eq!(session.state(), SessionState::AnswerHidden);
        assert_eq!(session.current().unwrap().id, "a");
        assert_eq!(session.reviewed_count(), 0);
    }

    #[test]
    fn test_three_question_session_finishes_after_all_processed() {
        let mut session = ReviewSession::new(
            "level-1".to_string(),
            vec![question("a", None), question("b", None), question("c", None)],
        );
        assert_eq!(session.total_count(), 3);

        session.advance(ReviewOutcome::Passed).unwrap();
        assert_eq!(session.pass_count(), 1);
        assert!(!session.is_finished());

        session.advance(ReviewOutcome::Failed).unwrap();
        assert!(!session.is_finished());

        session.advance(ReviewOutcome::Passed).unwrap();
        assert!(session.is_finished());
        assert_eq!(session.pass_count(), 2);
        assert_eq!(session.fail_count(), 1);
        assert_eq!(session.reviewed_count(), 3);
    }

    #[test]
    fn test_advance_resets_answer_visibility() {
        let mut session = ReviewSession::new(
            "level-1".to_string(),
            vec![question("a", None), question("b", None)],
        );

        session.reveal_answer().unwrap();
        session.advance(ReviewOutcome::Passed).unwrap();
        assert_eq!(session.state(), SessionState::AnswerHidden);
        assert_eq!(session.current().unwrap().id, "b");
    }

    #[test]
    fn test_remove_current_stays_on_next_question() {
        let mut session = ReviewSession::new(
            "level-1".to_string(),
            vec![question("a", None), question("b", None), question("c", None)],
        );

        let removed = session.remove_current().unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(session.current().unwrap().id, "b");
        // Deleting is not an outcome.
        assert_eq!(session.reviewed_count(), 0);
        assert_eq!(session.total_count(), 3);
        assert_eq!(session.remaining_count(), 2);
    }

    #[test]
    fn test_remove_last_question_finishes_session() {
        let mut session =
            ReviewSession::new("level-1".to_string(), vec![question("a", None)]);

        session.remove_current().unwrap();
        assert!(session.is_finished());
        assert!(session.remove_current().is_err());
    }

    #[test]
    fn test_finished_session_rejects_actions() {
        let mut session = ReviewSession::new("level-1".to_string(), vec![]);
        assert!(session.reveal_answer().is_err());
        assert!(session.hide_answer().is_err());
        assert!(session.advance(ReviewOutcome::Passed).is_err());
    }
}
