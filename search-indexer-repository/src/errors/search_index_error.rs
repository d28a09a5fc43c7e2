//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! covering both reachability failures and per-document write failures. The
//! distinction matters to callers: a missing index or a missing document is
//! recoverable (bootstrap retries, or the transport redelivers), while a
//! connection failure only surfaces through health reporting.

use thiserror::Error;

/// Unified errors from search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., empty document id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the search index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The target index does not exist. Recoverable: bootstrap creates it.
    #[error("Index missing: {0}")]
    IndexMissing(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to index (put) a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Failed to update a document.
    #[error("Update error: {0}")]
    UpdateError(String),

    /// Partial update targeted a document that does not exist.
    ///
    /// Usually an ordering anomaly: an answer event arrived before the
    /// question's create event. The caller must not acknowledge the message
    /// so the transport redelivers it.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// A search query failed.
    #[error("Search error: {0}")]
    SearchError(String),

    /// Failed to parse a response from the search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index-missing error.
    pub fn index_missing(name: impl Into<String>) -> Self {
        Self::IndexMissing(name.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an index (put) error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create an update error.
    pub fn update(msg: impl Into<String>) -> Self {
        Self::UpdateError(msg.into())
    }

    /// Create a document-not-found error.
    pub fn document_not_found(question_id: &str) -> Self {
        Self::DocumentNotFound(format!("question_id={}", question_id))
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a search error.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::SearchError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}
