//! Synonym group model: questions treated as semantically equivalent.

use serde::{Deserialize, Serialize};

/// An undirected group of two or more equivalent questions. A question
/// belongs to at most one group; linking questions from two existing
/// groups merges them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymGroup {
    pub id: String,
    pub question_ids: Vec<String>,
}

/// Request body for linking two questions as synonyms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSynonymsRequest {
    pub question_id: String,
    pub other_question_id: String,
}
