//! Search query parameters for the question index.

use serde::{Deserialize, Serialize};

/// Maximum page size accepted by the search surface.
pub const MAX_PER_PAGE: usize = 100;

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    10
}

/// A full-text search request against the question index.
///
/// Matches against `title` and `content`; `tag` narrows the result set to
/// questions carrying that exact tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The text to search for.
    pub query: String,

    /// Optional exact tag filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,

    /// Results per page, capped at [`MAX_PER_PAGE`].
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl SearchQuery {
    /// Create a query with default pagination.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            tag: None,
            page: default_page(),
            per_page: default_per_page(),
        }
    }

    /// Restrict results to questions carrying the given tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the page and page size, clamping the size to [`MAX_PER_PAGE`].
    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.min(MAX_PER_PAGE);
        self
    }

    /// Offset of the first result for the current page.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let query = SearchQuery::new("async").paginate(0, 500);
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_offset() {
        let query = SearchQuery::new("async").paginate(3, 10);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let query: SearchQuery = serde_json::from_str(r#"{"query":"borrow checker"}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
        assert!(query.tag.is_none());
    }
}
