//! Message types that flow between the consumer and the orchestrator.

use question_events::QuestionEvent;

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of question events with associated offsets for acknowledgment.
    Events {
        events: Vec<QuestionEvent>,
        /// (topic, partition, offset) per consumed message.
        offsets: Vec<(String, i32, i64)>,
    },
    /// Acknowledgment that events were successfully processed.
    ///
    /// `success: false` withholds the offset commit so the broker redelivers
    /// the batch - the at-least-once negative acknowledgment.
    Acknowledgment {
        offsets: Vec<(String, i32, i64)>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
