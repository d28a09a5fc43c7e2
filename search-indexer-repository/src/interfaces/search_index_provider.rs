//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch,
//! etc.). The indexer's loader, the bootstrap task, and the health checks all
//! depend on this trait rather than a concrete client.

use async_trait::async_trait;

use question_events::{QuestionDocument, SearchQuery, SearchResponse};

use crate::errors::SearchIndexError;
use crate::types::{DeleteQuestionRequest, EnsureOutcome, IndexStatus, UpdateQuestionRequest};

/// Abstracts the underlying search index implementation.
///
/// Write semantics are chosen so that at-least-once delivery is safe:
///
/// - [`put_document`](Self::put_document) overwrites, so replaying a create
///   converges on the same document instead of erroring.
/// - [`update_document`](Self::update_document) is a partial update without
///   upsert, so an update that arrives before its create fails loudly and the
///   message stays redeliverable, never minting a ghost document.
/// - [`delete_document`](Self::delete_document) treats an absent document as
///   success, so replays and delete-after-delete are harmless.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index exists, creating it if necessary.
    ///
    /// Called by the bootstrap task during startup. Returns
    /// [`EnsureOutcome::Ready`] if the index was already present and
    /// [`EnsureOutcome::Created`] if it had to be created. Any engine error
    /// other than the not-found signal fails this attempt; the caller owns
    /// the retry loop.
    async fn ensure_index_exists(&self) -> Result<EnsureOutcome, SearchIndexError>;

    /// Fresh reachability/presence probe for health reporting.
    ///
    /// Distinguishes "engine reachable, index present" from "engine
    /// reachable, index absent"; an unreachable engine is an `Err`.
    async fn index_status(&self) -> Result<IndexStatus, SearchIndexError>;

    /// Store a full document, overwriting any existing document with the
    /// same id.
    async fn put_document(&self, document: &QuestionDocument) -> Result<(), SearchIndexError>;

    /// Partially update an existing document.
    ///
    /// Only fields that are `Some` in the request are written. Fails with
    /// [`SearchIndexError::DocumentNotFound`] if the document does not exist.
    async fn update_document(&self, request: &UpdateQuestionRequest)
        -> Result<(), SearchIndexError>;

    /// Delete a document. Absence of the target is not an error.
    async fn delete_document(&self, request: &DeleteQuestionRequest)
        -> Result<(), SearchIndexError>;

    /// Full-text search over title and content with optional tag filter.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError>;
}
