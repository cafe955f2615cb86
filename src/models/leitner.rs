//! Leitner model: a named collection of levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Leitner box system owning a set of levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leitner {
    pub id: String,
    pub name: String,
    /// When set, a failed question drops back to level 1 instead of
    /// staying where it is.
    pub back_to_top_level_on_fail: bool,
    pub created_at: DateTime<Utc>,
}

/// One level in the plan supplied when creating a leitner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPlan {
    pub level_number: i64,
    pub days_to_recommend: i64,
}

/// Request body for creating a new leitner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeitnerRequest {
    pub name: String,
    #[serde(default)]
    pub back_to_top_level_on_fail: bool,
    /// Explicit level plan. When omitted, five levels with doubling
    /// intervals (1, 2, 4, 8, 16 days) are created.
    #[serde(default)]
    pub levels: Option<Vec<LevelPlan>>,
}

/// Request body for updating an existing leitner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeitnerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub back_to_top_level_on_fail: Option<bool>,
}
