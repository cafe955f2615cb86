//! Leitner scheduling engine.
//!
//! Pure functions over question/level state: review eligibility, the
//! level transition a pass or fail produces, and interval validation.
//! Persistence is applied elsewhere; nothing in this module touches the
//! store.

use chrono::{DateTime, Duration, Utc};

use crate::errors::AppError;
use crate::models::{Level, Question};

/// Lowest level number; new and failed-back questions land here.
pub const FIRST_LEVEL: i64 = 1;

/// Allowed range for a level's review interval, in days.
pub const MIN_DAYS_TO_RECOMMEND: i64 = 1;
pub const MAX_DAYS_TO_RECOMMEND: i64 = 365;

/// Outcome of reviewing one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Passed,
    Failed,
}

/// The state change a review outcome produces on a question.
///
/// `pass_time` is `None` when the existing value must be kept (fails
/// never touch it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    pub destination_level_id: String,
    pub destination_level_number: i64,
    pub completed: bool,
    pub pass_time: Option<DateTime<Utc>>,
    pub is_passed: bool,
}

/// Whether a question is due for review at `now`.
///
/// Completed questions are never due; questions that have never passed
/// are always due; otherwise the level's interval must have elapsed
/// since the last pass. Callers evaluating a whole listing must capture
/// `now` once and reuse it, so eligibility cannot flicker mid-listing.
pub fn is_reviewable(question: &Question, days_to_recommend: i64, now: DateTime<Utc>) -> bool {
    if question.completed {
        return false;
    }
    match question.pass_time {
        None => true,
        Some(passed_at) => now - passed_at >= Duration::days(days_to_recommend),
    }
}

/// Partition a level's questions into (reviewable, not reviewable)
/// counts against a single instant.
pub fn partition_reviewable(
    questions: &[Question],
    days_to_recommend: i64,
    now: DateTime<Utc>,
) -> (usize, usize) {
    let reviewable = questions
        .iter()
        .filter(|q| is_reviewable(q, days_to_recommend, now))
        .count();
    (reviewable, questions.len() - reviewable)
}

/// Plan the transition for a passed question.
///
/// The destination is the next higher level number within the leitner;
/// when the question already sits on the highest level it stays there
/// and is marked completed. `pass_time` always becomes `now`.
pub fn plan_pass(question: &Question, levels: &[Level], now: DateTime<Utc>) -> ReviewPlan {
    let next = levels
        .iter()
        .filter(|l| l.level_number > question.level_number)
        .min_by_key(|l| l.level_number);

    match next {
        Some(level) => ReviewPlan {
            destination_level_id: level.id.clone(),
            destination_level_number: level.level_number,
            completed: false,
            pass_time: Some(now),
            is_passed: true,
        },
        None => ReviewPlan {
            destination_level_id: question.level_id.clone(),
            destination_level_number: question.level_number,
            completed: true,
            pass_time: Some(now),
            is_passed: true,
        },
    }
}

/// Plan the transition for a failed question.
///
/// With `back_to_top_level_on_fail` the question drops to level 1,
/// otherwise it stays put. Either way it is no longer completed and its
/// last pass time is preserved.
pub fn plan_fail(
    question: &Question,
    levels: &[Level],
    back_to_top_level_on_fail: bool,
) -> Result<ReviewPlan, AppError> {
    let (destination_level_id, destination_level_number) = if back_to_top_level_on_fail {
        let first = first_level(levels)?;
        (first.id.clone(), first.level_number)
    } else {
        (question.level_id.clone(), question.level_number)
    };

    Ok(ReviewPlan {
        destination_level_id,
        destination_level_number,
        completed: false,
        pass_time: None,
        is_passed: false,
    })
}

/// Plan the transition for either review outcome.
pub fn plan_review(
    question: &Question,
    levels: &[Level],
    back_to_top_level_on_fail: bool,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
) -> Result<ReviewPlan, AppError> {
    match outcome {
        ReviewOutcome::Passed => Ok(plan_pass(question, levels, now)),
        ReviewOutcome::Failed => plan_fail(question, levels, back_to_top_level_on_fail),
    }
}

/// Plan a manual reset: back to level 1, not completed, no statistic.
/// Also used for cross-leitner moves, which always re-enter at level 1
/// of the destination.
pub fn plan_reset(levels: &[Level]) -> Result<(String, i64), AppError> {
    let first = first_level(levels)?;
    Ok((first.id.clone(), first.level_number))
}

/// Reject review intervals outside the supported range before any
/// mutation is attempted.
pub fn validate_days_to_recommend(days: i64) -> Result<(), AppError> {
    if !(MIN_DAYS_TO_RECOMMEND..=MAX_DAYS_TO_RECOMMEND).contains(&days) {
        return Err(AppError::Validation(format!(
            "daysToRecommend must be between {} and {}, got {}",
            MIN_DAYS_TO_RECOMMEND, MAX_DAYS_TO_RECOMMEND, days
        )));
    }
    Ok(())
}

fn first_level(levels: &[Level]) -> Result<&Level, AppError> {
    levels
        .iter()
        .find(|l| l.level_number == FIRST_LEVEL)
        .ok_or_else(|| AppError::Validation("Leitner has no level 1".to_string()))
}
