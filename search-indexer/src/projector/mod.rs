//! Projector module for the search indexer ingest.
//!
//! Transforms question events into index document mutations.

mod question_projector;

pub use question_projector::{IndexMutation, QuestionProjector};
