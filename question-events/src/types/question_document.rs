//! Document representation of a question in the search index.

use serde::{Deserialize, Serialize};

/// A question as stored in the search engine.
///
/// The document id equals the originating question's identifier; that
/// equality is the idempotency key for every projector write.
///
/// # Fields
///
/// - `id`: Question identifier (primary key in the index)
/// - `title`: Question title (primary search field)
/// - `content`: HTML-stripped plain-text body (secondary search field)
/// - `tags`: Tag names, in the order the author assigned them
/// - `created_at`: Creation time as unix seconds (default sort field)
/// - `answer_count`: Number of answers, absolute value
/// - `has_accepted_answer`: Whether any answer has been accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: i64,
    #[serde(default)]
    pub answer_count: i32,
    #[serde(default)]
    pub has_accepted_answer: bool,
}

impl QuestionDocument {
    /// Create a new document with zero answers and no accepted answer.
    ///
    /// # Arguments
    ///
    /// * `id` - The question identifier
    /// * `title` - The question title
    /// * `content` - Plain-text body (already HTML-stripped)
    /// * `tags` - Tag names
    /// * `created_at` - Creation time as unix seconds
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags,
            created_at,
            answer_count: 0,
            has_accepted_answer: false,
        }
    }
}
