//! # Question Events
//!
//! This crate defines the shared contracts for the question search pipeline.
//! It includes the domain event types published by the question service and
//! consumed by the search indexer, plus the document and query structures
//! used against the search index.
//!
//! The JSON wire shape of [`QuestionEvent`] is a stable API between services;
//! field names must not change without a coordinated rollout.

pub mod types;

pub use types::question_document::QuestionDocument;
pub use types::question_event::QuestionEvent;
pub use types::search_query::SearchQuery;
pub use types::search_result::SearchResponse;
