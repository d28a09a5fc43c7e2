//! Loader module for the search indexer ingest.
//!
//! Applies projected index mutations to the search engine through the
//! `SearchIndexProvider` trait.

use std::sync::Arc;
use tracing::{error, info, instrument};

use search_indexer_repository::{SearchIndexError, SearchIndexProvider};

use crate::errors::IngestError;
use crate::projector::IndexMutation;

/// Loader that applies document mutations to the search engine.
///
/// Mutations are applied in batch order. Any failure aborts the batch and
/// propagates, so the orchestrator withholds the acknowledgment and the
/// transport redelivers - idempotent mutations make the replay safe. The one
/// tolerated condition is deleting a document that is already gone, which the
/// provider reports as success.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self { provider }
    }

    /// Apply a batch of mutations to the search index.
    #[instrument(skip(self, mutations), fields(mutation_count = mutations.len()))]
    pub async fn apply(&self, mutations: Vec<IndexMutation>) -> Result<(), IngestError> {
        for mutation in mutations {
            self.apply_one(mutation).await?;
        }
        Ok(())
    }

    async fn apply_one(&self, mutation: IndexMutation) -> Result<(), IngestError> {
        match mutation {
            IndexMutation::Put(doc) => {
                let question_id = doc.id.clone();
                match self.provider.put_document(&doc).await {
                    Ok(()) => {
                        info!(question_id = %question_id, "Indexed question document");
                        Ok(())
                    }
                    Err(e) => {
                        error!(question_id = %question_id, error = %e, "Failed to index question document");
                        Err(IngestError::loader(format!(
                            "put {} failed: {}",
                            question_id, e
                        )))
                    }
                }
            }
            IndexMutation::Update(request) => {
                let question_id = request.question_id.clone();
                match self.provider.update_document(&request).await {
                    Ok(()) => {
                        info!(question_id = %question_id, "Updated question document");
                        Ok(())
                    }
                    Err(SearchIndexError::DocumentNotFound(detail)) => {
                        // Effect before cause: the update's target has not been
                        // created yet. Failing the batch keeps the message
                        // redeliverable instead of minting a ghost document.
                        error!(
                            question_id = %question_id,
                            detail = %detail,
                            "Update target not indexed yet; batch will be redelivered"
                        );
                        Err(IngestError::loader(format!(
                            "update {} failed: document not found",
                            question_id
                        )))
                    }
                    Err(e) => {
                        error!(question_id = %question_id, error = %e, "Failed to update question document");
                        Err(IngestError::loader(format!(
                            "update {} failed: {}",
                            question_id, e
                        )))
                    }
                }
            }
            IndexMutation::Delete(request) => {
                let question_id = request.question_id.clone();
                match self.provider.delete_document(&request).await {
                    Ok(()) => {
                        info!(question_id = %question_id, "Deleted question document");
                        Ok(())
                    }
                    Err(e) => {
                        error!(question_id = %question_id, error = %e, "Failed to delete question document");
                        Err(IngestError::loader(format!(
                            "delete {} failed: {}",
                            question_id, e
                        )))
                    }
                }
            }
        }
    }
}
