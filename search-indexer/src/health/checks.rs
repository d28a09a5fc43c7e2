//! Dependency health checks for the search indexer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use forum_kafka::ConnectionHandle;
use search_indexer_repository::{IndexStatus, SearchIndexProvider};

use super::{CheckOutcome, HealthCheck};

/// Probe timeout for the broker metadata fetch.
const BROKER_PROBE_TIMEOUT_SECS: u64 = 5;

/// Verifies broker connectivity with a fresh metadata fetch.
pub struct BrokerHealthCheck {
    brokers: String,
    connection: ConnectionHandle,
}

impl BrokerHealthCheck {
    pub fn new(brokers: impl Into<String>, connection: ConnectionHandle) -> Self {
        Self {
            brokers: brokers.into(),
            connection,
        }
    }
}

#[async_trait]
impl HealthCheck for BrokerHealthCheck {
    fn name(&self) -> &str {
        "kafka"
    }

    fn tags(&self) -> &[&'static str] {
        &["ready", "messaging"]
    }

    async fn check(&self) -> CheckOutcome {
        let probe = forum_kafka::probe_broker(
            &self.brokers,
            Duration::from_secs(BROKER_PROBE_TIMEOUT_SECS),
        )
        .await;

        let monitor = self.connection.status().await;

        match probe {
            Ok(()) => CheckOutcome::healthy(format!(
                "Broker reachable at {} (startup validation: {})",
                self.brokers, monitor.state
            )),
            Err(e) => CheckOutcome::unhealthy(format!(
                "Cannot reach broker at {}: {} (startup validation: {}, attempts: {})",
                self.brokers, e, monitor.state, monitor.attempts
            )),
        }
    }
}

/// Verifies search engine connectivity and index presence.
///
/// An engine that responds but lacks the index is Degraded rather than
/// Unhealthy: bootstrap (or a redeploy) can still repair it, and the process
/// itself is fine.
pub struct IndexHealthCheck {
    provider: Arc<dyn SearchIndexProvider>,
    index_alias: String,
}

impl IndexHealthCheck {
    pub fn new(provider: Arc<dyn SearchIndexProvider>, index_alias: impl Into<String>) -> Self {
        Self {
            provider,
            index_alias: index_alias.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for IndexHealthCheck {
    fn name(&self) -> &str {
        "search-index"
    }

    fn tags(&self) -> &[&'static str] {
        &["ready", "search"]
    }

    async fn check(&self) -> CheckOutcome {
        match self.provider.index_status().await {
            Ok(IndexStatus::Ready) => CheckOutcome::healthy(format!(
                "Search engine reachable, index '{}' present",
                self.index_alias
            )),
            Ok(IndexStatus::Missing) => CheckOutcome::degraded(format!(
                "Search engine reachable but index '{}' is absent",
                self.index_alias
            )),
            Err(e) => CheckOutcome::unhealthy(format!("Cannot reach search engine: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthStatus;
    use question_events::{QuestionDocument, SearchQuery, SearchResponse};
    use search_indexer_repository::{
        DeleteQuestionRequest, EnsureOutcome, SearchIndexError, UpdateQuestionRequest,
    };

    enum Behaviour {
        Ready,
        Missing,
        Unreachable,
    }

    struct FakeProvider {
        behaviour: Behaviour,
    }

    #[async_trait]
    impl SearchIndexProvider for FakeProvider {
        async fn ensure_index_exists(&self) -> Result<EnsureOutcome, SearchIndexError> {
            Ok(EnsureOutcome::Ready)
        }

        async fn index_status(&self) -> Result<IndexStatus, SearchIndexError> {
            match self.behaviour {
                Behaviour::Ready => Ok(IndexStatus::Ready),
                Behaviour::Missing => Ok(IndexStatus::Missing),
                Behaviour::Unreachable => Err(SearchIndexError::connection("refused")),
            }
        }

        async fn put_document(&self, _: &QuestionDocument) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn update_document(&self, _: &UpdateQuestionRequest) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn delete_document(&self, _: &DeleteQuestionRequest) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
            Ok(SearchResponse {
                results: vec![],
                total_found: 0,
                page: query.page,
                per_page: query.per_page,
                query: query.query.clone(),
                tag: query.tag.clone(),
            })
        }
    }

    fn check_with(behaviour: Behaviour) -> IndexHealthCheck {
        IndexHealthCheck::new(Arc::new(FakeProvider { behaviour }), "questions")
    }

    #[tokio::test]
    async fn test_index_present_is_healthy() {
        let outcome = check_with(Behaviour::Ready).check().await;
        assert_eq!(outcome.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_index_absent_is_degraded_not_unhealthy() {
        // Engine reachable, collection missing: readiness must degrade, not
        // report the engine as down.
        let outcome = check_with(Behaviour::Missing).check().await;
        assert_eq!(outcome.status, HealthStatus::Degraded);
        assert!(outcome.detail.unwrap().contains("absent"));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unhealthy() {
        let outcome = check_with(Behaviour::Unreachable).check().await;
        assert_eq!(outcome.status, HealthStatus::Unhealthy);
        assert!(outcome.error.is_some());
    }
}
