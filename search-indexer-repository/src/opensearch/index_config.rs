//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the question
//! search index.

use serde_json::{json, Value};

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name used for all document operations.
    pub alias: String,
    /// The version number for the physical index (e.g., 0 for "questions_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// The versioned physical index name (e.g., "questions_v0").
    ///
    /// Documents are written through the alias; the versioned name exists so
    /// a schema change can be rolled out as a new index plus a backfill,
    /// never as an in-place mutation.
    pub fn versioned_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

/// Get the index settings and mappings for the question search index.
///
/// The field set is fixed:
/// - **search_as_you_type** on title and content for prefix matching
/// - **keyword** tags for exact filtering
/// - **createdAt** as a long (unix seconds), also the index sort field
/// - answer metadata as integer/boolean
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1,
            "sort.field": "createdAt",
            "sort.order": "desc"
        },
        "mappings": {
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "title": {
                    "type": "search_as_you_type",
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "content": {
                    "type": "search_as_you_type"
                },
                "tags": {
                    "type": "keyword"
                },
                "createdAt": {
                    "type": "long"
                },
                "answerCount": {
                    "type": "integer"
                },
                "hasAcceptedAnswer": {
                    "type": "boolean"
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_name() {
        assert_eq!(IndexConfig::new("questions", 0).versioned_name(), "questions_v0");
        assert_eq!(IndexConfig::new("questions", 3).versioned_name(), "questions_v3");
    }

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert_eq!(settings["settings"]["sort.field"], "createdAt");

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["id"]["type"], "keyword");
        assert_eq!(properties["title"]["type"], "search_as_you_type");
        assert_eq!(properties["content"]["type"], "search_as_you_type");
        assert_eq!(properties["tags"]["type"], "keyword");
        assert_eq!(properties["createdAt"]["type"], "long");
        assert_eq!(properties["answerCount"]["type"], "integer");
        assert_eq!(properties["hasAcceptedAnswer"]["type"], "boolean");
    }
}
