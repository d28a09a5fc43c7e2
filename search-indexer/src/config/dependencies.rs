//! Dependency initialization and wiring for the search indexer.
//!
//! Builds the ingest pipeline and spawns the background tasks that must not
//! block startup: broker connection validation, index bootstrap, and the
//! health/search HTTP server. All of them share the orchestrator's shutdown
//! channel so one signal winds the whole service down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use forum_kafka::{ConnectionMonitor, RetryPolicy};
use search_indexer_repository::opensearch::IndexConfig;
use search_indexer_repository::{OpenSearchProvider, SearchIndexProvider};

use crate::bootstrap;
use crate::config::Settings;
use crate::consumer::KafkaConsumer;
use crate::health::checks::{BrokerHealthCheck, IndexHealthCheck};
use crate::health::{AppState, HealthRegistry};
use crate::loader::SearchLoader;
use crate::orchestrator::Orchestrator;
use crate::projector::QuestionProjector;
use crate::IndexingError;

/// Timeout for a single broker validation probe.
const BROKER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    background: Vec<JoinHandle<()>>,
}

impl Dependencies {
    /// Wire the service from settings.
    ///
    /// Fails only on configuration problems (bad URL, unparseable broker
    /// list). Reachability of the broker and the engine is validated in the
    /// background and reflected in readiness - an unreachable dependency
    /// never prevents startup.
    pub fn new(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            kafka_broker = %settings.kafka_broker,
            opensearch_url = %settings.opensearch_url,
            kafka_group_id = %settings.kafka_group_id,
            topic = %settings.topic,
            index_alias = %settings.index_alias,
            "Initializing dependencies"
        );

        let index_config = IndexConfig::new(&settings.index_alias, settings.index_version);
        let provider: Arc<dyn SearchIndexProvider> = Arc::new(
            OpenSearchProvider::new(&settings.opensearch_url, index_config).map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
            })?,
        );

        let consumer = Arc::new(
            KafkaConsumer::new(
                &settings.kafka_broker,
                &settings.kafka_group_id,
                &settings.topic,
            )
            .map_err(|e| {
                IndexingError::config(format!("Failed to create Kafka consumer: {}", e))
            })?,
        );

        let projector = QuestionProjector::new();
        let loader = SearchLoader::new(Arc::clone(&provider));
        let orchestrator = Orchestrator::new(consumer, projector, loader);
        let shutdown_tx = orchestrator.shutdown_handle();

        // Broker connection validation, detached from the startup path.
        let broker_monitor = ConnectionMonitor::new("kafka-broker");
        let broker_handle = broker_monitor.handle();
        let brokers = settings.kafka_broker.clone();
        let monitor_shutdown = shutdown_tx.subscribe();
        let monitor_task = tokio::spawn(async move {
            let policy = RetryPolicy::default();
            broker_monitor
                .ensure_reachable(
                    || {
                        let brokers = brokers.clone();
                        async move { forum_kafka::probe_broker(&brokers, BROKER_PROBE_TIMEOUT).await }
                    },
                    &policy,
                    monitor_shutdown,
                )
                .await;
        });

        // Index bootstrap, delayed so it never blocks request serving.
        let bootstrap_provider = Arc::clone(&provider);
        let bootstrap_config = settings.bootstrap.clone();
        let bootstrap_shutdown = shutdown_tx.subscribe();
        let bootstrap_task = tokio::spawn(async move {
            bootstrap::run(bootstrap_provider, bootstrap_config, bootstrap_shutdown).await;
        });

        // Health + search HTTP surface.
        let registry = Arc::new(HealthRegistry::new(vec![
            Arc::new(BrokerHealthCheck::new(
                settings.kafka_broker.clone(),
                broker_handle,
            )),
            Arc::new(IndexHealthCheck::new(
                Arc::clone(&provider),
                settings.index_alias.clone(),
            )),
        ]));
        let state = AppState::new(registry, Arc::clone(&provider));
        let server_shutdown = shutdown_tx.subscribe();
        let server_task = tokio::spawn(crate::health::serve(
            state,
            settings.health_port,
            server_shutdown,
        ));

        Ok(Self {
            orchestrator,
            background: vec![monitor_task, bootstrap_task, server_task],
        })
    }

    /// Wait for the background tasks after the orchestrator has stopped.
    pub async fn join_background(self) {
        for handle in self.background {
            let _ = handle.await;
        }
    }
}
