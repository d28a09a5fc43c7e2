//! Search result types returned by the question index.

use serde::{Deserialize, Serialize};

use crate::types::question_document::QuestionDocument;

/// A page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Matching documents, best match first.
    pub results: Vec<QuestionDocument>,
    /// Total number of matches across all pages.
    pub total_found: u64,
    /// 1-based page number of this page.
    pub page: usize,
    /// Page size used for this response.
    pub per_page: usize,
    /// The text query that produced these results.
    pub query: String,
    /// The tag filter applied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let response = SearchResponse {
            results: vec![QuestionDocument::new("q1", "t", "c", vec![], 1)],
            total_found: 1,
            page: 1,
            per_page: 10,
            query: "t".to_string(),
            tag: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalFound"], 1);
        assert_eq!(json["perPage"], 10);
        assert!(json.get("tag").is_none());
    }
}
