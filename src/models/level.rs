//! Level model: one box within a leitner.

use serde::{Deserialize, Serialize};

/// A single Leitner box. `days_to_recommend` is the review interval a
/// passed question must wait out before it becomes due again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: String,
    pub leitner_id: String,
    pub level_number: i64,
    pub days_to_recommend: i64,
}

/// A level together with its due/not-due partition, computed against a
/// single instant for the whole listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOverview {
    pub level: Level,
    pub question_count: usize,
    pub reviewable_count: usize,
    pub not_reviewable_count: usize,
    pub favorite_count: usize,
}

/// Request body for adding a level to a leitner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLevelRequest {
    pub level_number: i64,
    pub days_to_recommend: i64,
}

/// Request body for changing a level's review interval.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLevelRequest {
    pub days_to_recommend: i64,
}
