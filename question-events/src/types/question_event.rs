//! Domain event types published on question mutations.
//!
//! Every committed mutation of a question emits exactly one event. Events are
//! serialized as JSON with a `type` discriminator and camelCase field names;
//! this wire shape is shared between the publisher and all consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A domain event describing a committed question mutation.
///
/// The transport guarantees at-least-once delivery per event but no ordering
/// between distinct variants for the same question, so consumers must apply
/// every variant idempotently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionEvent {
    /// A new question was posted.
    #[serde(rename_all = "camelCase")]
    QuestionCreated {
        id: String,
        title: String,
        /// Raw HTML body as stored by the question service.
        content: String,
        tags: Vec<String>,
        created_at_utc: DateTime<Utc>,
    },

    /// Title, body, or tags of an existing question changed.
    #[serde(rename_all = "camelCase")]
    QuestionUpdated {
        id: String,
        title: String,
        content: String,
        tags: Vec<String>,
    },

    /// A question was removed.
    #[serde(rename_all = "camelCase")]
    QuestionDeleted { id: String },

    /// One of the question's answers was marked as accepted.
    #[serde(rename_all = "camelCase")]
    AnswerAccepted { parent_id: String },

    /// The number of answers on a question changed. `count` is the absolute
    /// value after the change, not a delta.
    #[serde(rename_all = "camelCase")]
    AnswerCountChanged { parent_id: String, count: i32 },
}

impl QuestionEvent {
    /// The identifier of the mutated question.
    ///
    /// Used as the message key on the transport and as the idempotency key
    /// for all index writes.
    pub fn partition_key(&self) -> &str {
        match self {
            QuestionEvent::QuestionCreated { id, .. } => id,
            QuestionEvent::QuestionUpdated { id, .. } => id,
            QuestionEvent::QuestionDeleted { id } => id,
            QuestionEvent::AnswerAccepted { parent_id } => parent_id,
            QuestionEvent::AnswerCountChanged { parent_id, .. } => parent_id,
        }
    }

    /// Stable variant name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            QuestionEvent::QuestionCreated { .. } => "QuestionCreated",
            QuestionEvent::QuestionUpdated { .. } => "QuestionUpdated",
            QuestionEvent::QuestionDeleted { .. } => "QuestionDeleted",
            QuestionEvent::AnswerAccepted { .. } => "AnswerAccepted",
            QuestionEvent::AnswerCountChanged { .. } => "AnswerCountChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_created_wire_shape() {
        let event = QuestionEvent::QuestionCreated {
            id: "q1".to_string(),
            title: "How?".to_string(),
            content: "<p>Why</p>".to_string(),
            tags: vec!["rust".to_string()],
            created_at_utc: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "QuestionCreated");
        assert_eq!(json["id"], "q1");
        assert_eq!(json["title"], "How?");
        assert_eq!(json["content"], "<p>Why</p>");
        assert_eq!(json["tags"][0], "rust");
        assert!(json["createdAtUtc"].is_string());
        // Internal field naming must not leak onto the wire.
        assert!(json.get("created_at_utc").is_none());
    }

    #[test]
    fn test_answer_events_wire_shape() {
        let accepted = QuestionEvent::AnswerAccepted {
            parent_id: "q1".to_string(),
        };
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["type"], "AnswerAccepted");
        assert_eq!(json["parentId"], "q1");

        let counted = QuestionEvent::AnswerCountChanged {
            parent_id: "q2".to_string(),
            count: 7,
        };
        let json = serde_json::to_value(&counted).unwrap();
        assert_eq!(json["type"], "AnswerCountChanged");
        assert_eq!(json["parentId"], "q2");
        assert_eq!(json["count"], 7);
    }

    #[test]
    fn test_round_trip() {
        let event = QuestionEvent::QuestionUpdated {
            id: "q9".to_string(),
            title: "Edited".to_string(),
            content: "body".to_string(),
            tags: vec![],
        };

        let json = serde_json::to_string(&event).unwrap();
        let decoded: QuestionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_partition_key() {
        let deleted = QuestionEvent::QuestionDeleted {
            id: "q3".to_string(),
        };
        assert_eq!(deleted.partition_key(), "q3");

        let accepted = QuestionEvent::AnswerAccepted {
            parent_id: "q4".to_string(),
        };
        assert_eq!(accepted.partition_key(), "q4");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let raw = r#"{"type":"QuestionArchived","id":"q1"}"#;
        assert!(serde_json::from_str::<QuestionEvent>(raw).is_err());
    }
}
