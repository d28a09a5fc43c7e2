//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    DeleteParts, IndexParts, OpenSearch, SearchParts, UpdateParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use question_events::{QuestionDocument, SearchQuery, SearchResponse};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{DeleteQuestionRequest, EnsureOutcome, IndexStatus, UpdateQuestionRequest};

/// OpenSearch provider implementation.
///
/// All document operations go through the index alias; the versioned physical
/// index only appears during bootstrap.
///
/// # Example
///
/// ```ignore
/// use search_indexer_repository::opensearch::IndexConfig;
/// let config = IndexConfig::new("questions", 0);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config)?;
///
/// provider.ensure_index_exists().await?;
/// provider.put_document(&doc).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the given URL.
    ///
    /// Building the client does not touch the network; the first request
    /// does. Reachability is validated separately by the connection monitor
    /// and the bootstrap task.
    pub fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Reject ids that cannot serve as document keys.
    fn validate_document_id(question_id: &str) -> Result<(), SearchIndexError> {
        if question_id.trim().is_empty() {
            return Err(SearchIndexError::validation(
                "question id must not be empty",
            ));
        }
        Ok(())
    }

    /// Build the partial-update body from the fields present in the request.
    ///
    /// Field names here are index field names and must stay in sync with the
    /// mappings in `index_config`.
    fn partial_update_doc(request: &UpdateQuestionRequest) -> serde_json::Map<String, Value> {
        let mut doc = serde_json::Map::new();
        if let Some(ref title) = request.title {
            doc.insert("title".to_string(), json!(title));
        }
        if let Some(ref content) = request.content {
            doc.insert("content".to_string(), json!(content));
        }
        if let Some(ref tags) = request.tags {
            doc.insert("tags".to_string(), json!(tags));
        }
        if let Some(answer_count) = request.answer_count {
            doc.insert("answerCount".to_string(), json!(answer_count));
        }
        if let Some(has_accepted_answer) = request.has_accepted_answer {
            doc.insert("hasAcceptedAnswer".to_string(), json!(has_accepted_answer));
        }
        doc
    }

    /// Build the search request body for a query.
    fn search_body(query: &SearchQuery) -> Value {
        let mut must = vec![json!({
            "multi_match": {
                "query": query.query,
                "fields": ["title^2", "content"]
            }
        })];

        if let Some(ref tag) = query.tag {
            must.push(json!({ "term": { "tags": tag } }));
        }

        json!({
            "from": query.offset(),
            "size": query.per_page,
            "query": { "bool": { "must": must } }
        })
    }

    /// Check whether the versioned physical index exists.
    async fn index_exists(&self) -> Result<bool, SearchIndexError> {
        let name = self.index_config.versioned_name();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[&name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SearchIndexError::connection(format!(
                "Unexpected status {} checking index '{}'",
                status, name
            ))),
        }
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_index_exists(&self) -> Result<EnsureOutcome, SearchIndexError> {
        let name = self.index_config.versioned_name();

        if self.index_exists().await? {
            debug!(index = %name, "Index already exists");
            return Ok(EnsureOutcome::Ready);
        }

        info!(index = %name, alias = %self.index_config.alias, "Index not found, creating it");

        // Create the versioned index and bind the alias in the same call.
        let mut body = get_index_settings();
        body["aliases"] = json!({});
        body["aliases"][self.index_config.alias.as_str()] = json!({});

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Create index '{}' failed with status {}: {}",
                name, status, error_body
            )));
        }

        info!(index = %name, "Index created");
        Ok(EnsureOutcome::Created)
    }

    async fn index_status(&self) -> Result<IndexStatus, SearchIndexError> {
        if self.index_exists().await? {
            Ok(IndexStatus::Ready)
        } else {
            Ok(IndexStatus::Missing)
        }
    }

    async fn put_document(&self, document: &QuestionDocument) -> Result<(), SearchIndexError> {
        Self::validate_document_id(&document.id)?;

        let response = self
            .client
            .index(IndexParts::IndexId(&self.index_config.alias, &document.id))
            .body(document)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Put request failed");
            return Err(SearchIndexError::index(format!(
                "Put failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(question_id = %document.id, "Document stored");
        Ok(())
    }

    async fn update_document(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<(), SearchIndexError> {
        Self::validate_document_id(&request.question_id)?;

        let doc = Self::partial_update_doc(request);
        if doc.is_empty() {
            // No fields to update
            return Ok(());
        }

        // Deliberately no doc_as_upsert: a missing target must fail so the
        // message is redelivered once the create has been applied.
        let response = self
            .client
            .update(UpdateParts::IndexId(
                &self.index_config.alias,
                &request.question_id,
            ))
            .body(json!({ "doc": doc }))
            .send()
            .await
            .map_err(|e| SearchIndexError::update(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(SearchIndexError::document_not_found(&request.question_id));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Update request failed");
            return Err(SearchIndexError::update(format!(
                "Update failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(question_id = %request.question_id, "Document updated");
        Ok(())
    }

    async fn delete_document(
        &self,
        request: &DeleteQuestionRequest,
    ) -> Result<(), SearchIndexError> {
        Self::validate_document_id(&request.question_id)?;

        let response = self
            .client
            .delete(DeleteParts::IndexId(
                &self.index_config.alias,
                &request.question_id,
            ))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the document may never have existed, or a
        // replayed delete already removed it
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(question_id = %request.question_id, "Document deleted");
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
        let body = Self::search_body(query);

        let response = self
            .client
            .search(SearchParts::Index(&[&self.index_config.alias]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::search(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Search request failed");
            return Err(SearchIndexError::search(format!(
                "Search failed with status {}: {}",
                status, error_body
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let total_found = json["hits"]["total"]["value"].as_u64().unwrap_or(0);

        let mut results = Vec::new();
        if let Some(hits) = json["hits"]["hits"].as_array() {
            for hit in hits {
                let document: QuestionDocument = serde_json::from_value(hit["_source"].clone())
                    .map_err(|e| {
                        SearchIndexError::parse(format!("Invalid document in search hit: {}", e))
                    })?;
                results.push(document);
            }
        }

        Ok(SearchResponse {
            results,
            total_found,
            page: query.page,
            per_page: query.per_page,
            query: query.query.clone(),
            tag: query.tag.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document_id() {
        assert!(OpenSearchProvider::validate_document_id("q1").is_ok());
        assert!(matches!(
            OpenSearchProvider::validate_document_id(""),
            Err(SearchIndexError::ValidationError(_))
        ));
        assert!(matches!(
            OpenSearchProvider::validate_document_id("   "),
            Err(SearchIndexError::ValidationError(_))
        ));
    }

    #[test]
    fn test_partial_update_doc_only_present_fields() {
        let request = UpdateQuestionRequest::accepted_answer("q1");
        let doc = OpenSearchProvider::partial_update_doc(&request);

        assert_eq!(doc.len(), 1);
        assert_eq!(doc["hasAcceptedAnswer"], json!(true));
    }

    #[test]
    fn test_partial_update_doc_content_update() {
        let request = UpdateQuestionRequest::content_update(
            "q1",
            "Edited title",
            "edited body",
            vec!["rust".to_string()],
        );
        let doc = OpenSearchProvider::partial_update_doc(&request);

        assert_eq!(doc["title"], json!("Edited title"));
        assert_eq!(doc["content"], json!("edited body"));
        assert_eq!(doc["tags"], json!(["rust"]));
        // Fields the request does not carry must stay untouched.
        assert!(!doc.contains_key("createdAt"));
        assert!(!doc.contains_key("answerCount"));
        assert!(!doc.contains_key("hasAcceptedAnswer"));
    }

    #[test]
    fn test_partial_update_doc_answer_count_is_absolute() {
        let request = UpdateQuestionRequest::answer_count("q1", 4);
        let doc = OpenSearchProvider::partial_update_doc(&request);

        assert_eq!(doc.len(), 1);
        assert_eq!(doc["answerCount"], json!(4));
    }

    #[test]
    fn test_search_body_without_tag() {
        let query = SearchQuery::new("borrow checker").paginate(2, 10);
        let body = OpenSearchProvider::search_body(&query);

        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 10);
        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 1);
        assert_eq!(must[0]["multi_match"]["query"], "borrow checker");
    }

    #[test]
    fn test_search_body_with_tag_filter() {
        let query = SearchQuery::new("async").with_tag("tokio");
        let body = OpenSearchProvider::search_body(&query);

        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[1]["term"]["tags"], "tokio");
    }
}
