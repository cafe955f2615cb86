//! Search and sort over a leitner's question set.
//!
//! Free-text search is a case-insensitive substring match against the
//! question, answer and detail fields, ranked by which field matched and
//! capped to a fixed result count. Sorting is stable so repeated
//! applications of the same key leave the order untouched.

use serde::Deserialize;

use crate::models::Question;

/// Maximum number of search results returned.
const RESULT_LIMIT: usize = 20;

/// Queries shorter than this return nothing, so the first keystroke in a
/// client cannot flood the result list.
const MIN_QUERY_CHARS: usize = 2;

/// Sort keys for question listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Level,
    Completed,
    Alphabet,
    Favorite,
    Date,
}

/// Which field a search hit matched on; doubles as the result ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchField {
    Question,
    Answer,
    Detail,
}

/// Search a question set for a free-text query.
///
/// Results are ordered by matched field (question before answer before
/// detail), ties broken alphabetically on the question text, and capped
/// at [`RESULT_LIMIT`].
pub fn search_questions(questions: &[Question], query: &str) -> Vec<Question> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut hits: Vec<(MatchField, &Question)> = questions
        .iter()
        .filter_map(|q| match_field(q, &needle).map(|field| (field, q)))
        .collect();

    hits.sort_by(|(field_a, a), (field_b, b)| {
        field_a.cmp(field_b).then_with(|| a.question.cmp(&b.question))
    });

    hits.into_iter()
        .take(RESULT_LIMIT)
        .map(|(_, q)| q.clone())
        .collect()
}

fn match_field(question: &Question, needle: &str) -> Option<MatchField> {
    if question.question.to_lowercase().contains(needle) {
        return Some(MatchField::Question);
    }
    if question.answer.to_lowercase().contains(needle) {
        return Some(MatchField::Answer);
    }
    if let Some(detail) = &question.detail {
        if detail.to_lowercase().contains(needle) {
            return Some(MatchField::Detail);
        }
    }
    None
}

/// Stable sort of a question list by the given key.
///
/// `Date` orders by ascending pass time with never-passed questions
/// first; that null-is-oldest policy is fixed rather than evaluated per
/// comparison.
pub fn sort_questions(questions: &mut [Question], key: SortKey) {
    match key {
        SortKey::Level => questions.sort_by_key(|q| q.level_number),
        SortKey::Completed => questions.sort_by_key(|q| !q.completed),
        SortKey::Alphabet => questions.sort_by(|a, b| a.question.cmp(&b.question)),
        SortKey::Favorite => questions.sort_by_key(|q| !q.favorite),
        SortKey::Date => questions.sort_by_key(|q| q.pass_time),
    }
}
