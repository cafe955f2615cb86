//! Statistic model: one immutable pass/fail event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An append-only record of a single review outcome. Written only by
/// pass/fail transitions; removed only when its question is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub id: String,
    pub question_id: String,
    pub is_passed: bool,
    pub action_date: DateTime<Utc>,
}
