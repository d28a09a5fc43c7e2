//! Question projector implementation.
//!
//! Projects each domain event onto the search index as a document mutation.
//! Dispatch is a closed match over the event union - one arm per variant -
//! and every arm produces a mutation that is safe to apply more than once.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument};

use question_events::{QuestionDocument, QuestionEvent};
use search_indexer_repository::{DeleteQuestionRequest, UpdateQuestionRequest};

use crate::errors::IngestError;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// A document mutation to be applied to the search index.
#[derive(Debug, Clone)]
pub enum IndexMutation {
    /// Store the full document, overwriting any existing one with the same id.
    Put(QuestionDocument),
    /// Partially update an existing document; fails if it does not exist.
    Update(UpdateQuestionRequest),
    /// Remove the document if present.
    Delete(DeleteQuestionRequest),
}

impl IndexMutation {
    /// The question id this mutation targets.
    pub fn question_id(&self) -> &str {
        match self {
            IndexMutation::Put(doc) => &doc.id,
            IndexMutation::Update(request) => &request.question_id,
            IndexMutation::Delete(request) => &request.question_id,
        }
    }
}

/// Strip HTML markup, keeping the text content.
fn strip_html(content: &str) -> String {
    HTML_TAG.replace_all(content, "").into_owned()
}

/// Projector that transforms question events into index mutations.
pub struct QuestionProjector;

impl QuestionProjector {
    pub fn new() -> Self {
        Self
    }

    /// Project a batch of events into mutations, preserving order.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub fn project_batch(
        &self,
        events: Vec<QuestionEvent>,
    ) -> Result<Vec<IndexMutation>, IngestError> {
        let mutations = events.into_iter().map(|e| self.project(e)).collect();
        Ok(mutations)
    }

    /// Project a single event into its index mutation.
    pub fn project(&self, event: QuestionEvent) -> IndexMutation {
        debug!(
            event = event.name(),
            question_id = %event.partition_key(),
            "Projecting event"
        );

        match event {
            QuestionEvent::QuestionCreated {
                id,
                title,
                content,
                tags,
                created_at_utc,
            } => IndexMutation::Put(QuestionDocument::new(
                id,
                title,
                strip_html(&content),
                tags,
                created_at_utc.timestamp(),
            )),

            QuestionEvent::QuestionUpdated {
                id,
                title,
                content,
                tags,
            } => IndexMutation::Update(UpdateQuestionRequest::content_update(
                id,
                title,
                strip_html(&content),
                tags,
            )),

            QuestionEvent::QuestionDeleted { id } => {
                IndexMutation::Delete(DeleteQuestionRequest::new(id))
            }

            QuestionEvent::AnswerAccepted { parent_id } => {
                IndexMutation::Update(UpdateQuestionRequest::accepted_answer(parent_id))
            }

            QuestionEvent::AnswerCountChanged { parent_id, count } => {
                IndexMutation::Update(UpdateQuestionRequest::answer_count(parent_id, count))
            }
        }
    }
}

impl Default for QuestionProjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn created_event() -> QuestionEvent {
        QuestionEvent::QuestionCreated {
            id: "q1".to_string(),
            title: "How?".to_string(),
            content: "<p>Why</p>".to_string(),
            tags: vec!["go".to_string()],
            created_at_utc: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Why</p>"), "Why");
        assert_eq!(
            strip_html("<div class=\"x\">a <b>b</b> c</div>"),
            "a b c"
        );
        assert_eq!(strip_html("no markup"), "no markup");
    }

    #[test]
    fn test_project_created() {
        let projector = QuestionProjector::new();
        let expected_epoch = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap()
            .timestamp();

        let mutation = projector.project(created_event());

        match mutation {
            IndexMutation::Put(doc) => {
                assert_eq!(doc.id, "q1");
                assert_eq!(doc.title, "How?");
                assert_eq!(doc.content, "Why");
                assert_eq!(doc.tags, vec!["go".to_string()]);
                assert_eq!(doc.created_at, expected_epoch);
                assert_eq!(doc.answer_count, 0);
                assert!(!doc.has_accepted_answer);
            }
            other => panic!("Expected Put, got {:?}", other),
        }
    }

    #[test]
    fn test_project_created_is_deterministic() {
        // Replaying the same create must produce the same document, so a
        // second application overwrites instead of diverging.
        let projector = QuestionProjector::new();

        let first = projector.project(created_event());
        let second = projector.project(created_event());

        match (first, second) {
            (IndexMutation::Put(a), IndexMutation::Put(b)) => assert_eq!(a, b),
            other => panic!("Expected two Puts, got {:?}", other),
        }
    }

    #[test]
    fn test_project_updated_touches_content_fields_only() {
        let projector = QuestionProjector::new();

        let mutation = projector.project(QuestionEvent::QuestionUpdated {
            id: "q1".to_string(),
            title: "Edited".to_string(),
            content: "<em>new</em> body".to_string(),
            tags: vec!["rust".to_string()],
        });

        match mutation {
            IndexMutation::Update(request) => {
                assert_eq!(request.question_id, "q1");
                assert_eq!(request.title.as_deref(), Some("Edited"));
                assert_eq!(request.content.as_deref(), Some("new body"));
                assert_eq!(request.tags, Some(vec!["rust".to_string()]));
                assert!(request.answer_count.is_none());
                assert!(request.has_accepted_answer.is_none());
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_project_deleted() {
        let projector = QuestionProjector::new();

        let mutation = projector.project(QuestionEvent::QuestionDeleted {
            id: "q1".to_string(),
        });

        assert!(matches!(mutation, IndexMutation::Delete(_)));
        assert_eq!(mutation.question_id(), "q1");
    }

    #[test]
    fn test_project_answer_accepted() {
        let projector = QuestionProjector::new();

        let mutation = projector.project(QuestionEvent::AnswerAccepted {
            parent_id: "q1".to_string(),
        });

        match mutation {
            IndexMutation::Update(request) => {
                assert_eq!(request.question_id, "q1");
                assert_eq!(request.has_accepted_answer, Some(true));
                assert!(request.title.is_none());
                assert!(request.answer_count.is_none());
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_project_answer_count_is_absolute() {
        let projector = QuestionProjector::new();

        let mutation = projector.project(QuestionEvent::AnswerCountChanged {
            parent_id: "q1".to_string(),
            count: 12,
        });

        match mutation {
            IndexMutation::Update(request) => {
                assert_eq!(request.answer_count, Some(12));
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_project_batch_preserves_order() {
        let projector = QuestionProjector::new();

        let mutations = projector
            .project_batch(vec![
                created_event(),
                QuestionEvent::AnswerCountChanged {
                    parent_id: "q1".to_string(),
                    count: 1,
                },
                QuestionEvent::QuestionDeleted {
                    id: "q2".to_string(),
                },
            ])
            .unwrap();

        assert_eq!(mutations.len(), 3);
        assert!(matches!(mutations[0], IndexMutation::Put(_)));
        assert!(matches!(mutations[1], IndexMutation::Update(_)));
        assert!(matches!(mutations[2], IndexMutation::Delete(_)));
    }
}
