//! Question model: a single flashcard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A flashcard. Belongs to exactly one level at a time; `level_number`
/// and `leitner_id` are denormalized from the owning level for sorting
/// and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub leitner_id: String,
    pub level_id: String,
    pub level_number: i64,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub completed: bool,
    pub favorite: bool,
    /// Last time this question passed a review; `None` for new cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a new question. New questions always enter
/// at level 1 of their leitner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// Request body for updating an existing question.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub favorite: Option<bool>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Request body for moving a question to another leitner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveQuestionRequest {
    pub target_leitner_id: String,
}
