//! Shared type definitions for the question search pipeline.

pub mod question_document;
pub mod question_event;
pub mod search_query;
pub mod search_result;
