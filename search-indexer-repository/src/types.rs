//! Request and status types for search index operations.

/// Outcome of an index bootstrap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The index already existed; nothing was done.
    Ready,
    /// The index was absent and has been created.
    Created,
}

/// Presence of the index, as seen by a reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The engine responded and the index exists.
    Ready,
    /// The engine responded but the index does not exist.
    Missing,
}

/// Request to partially update a question document.
///
/// Only fields that are `Some` are written; everything else is left untouched
/// in the index. This is **not** an upsert: updating a document that does not
/// exist fails with `DocumentNotFound`, which callers rely on to detect
/// effect-before-cause delivery.
#[derive(Debug, Clone, Default)]
pub struct UpdateQuestionRequest {
    /// The question's identifier (the document id).
    pub question_id: String,
    pub title: Option<String>,
    /// HTML-stripped plain-text body.
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Absolute answer count (not a delta).
    pub answer_count: Option<i32>,
    pub has_accepted_answer: Option<bool>,
}

impl UpdateQuestionRequest {
    /// Update of the searchable content fields after a question edit.
    pub fn content_update(
        question_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            title: Some(title.into()),
            content: Some(content.into()),
            tags: Some(tags),
            ..Default::default()
        }
    }

    /// Mark the question as having an accepted answer.
    pub fn accepted_answer(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            has_accepted_answer: Some(true),
            ..Default::default()
        }
    }

    /// Set the absolute answer count.
    pub fn answer_count(question_id: impl Into<String>, count: i32) -> Self {
        Self {
            question_id: question_id.into(),
            answer_count: Some(count),
            ..Default::default()
        }
    }
}

/// Request to delete a question document from the search index.
#[derive(Debug, Clone)]
pub struct DeleteQuestionRequest {
    /// The question's identifier (the document id).
    pub question_id: String,
}

impl DeleteQuestionRequest {
    pub fn new(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
        }
    }
}
