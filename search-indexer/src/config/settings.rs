//! Environment-backed service settings.
//!
//! Connection endpoints are required and missing values abort startup -
//! misconfiguration must fail fast, never silently degrade. Everything else
//! has sensible defaults.

use std::env;
use std::time::Duration;

use crate::bootstrap::BootstrapConfig;
use crate::IndexingError;

/// Default Kafka consumer group ID. This is the service's durable
/// subscription name, deliberately distinct from the topic it binds to.
const DEFAULT_KAFKA_GROUP_ID: &str = "questions.search";

/// Default topic carrying question events.
const DEFAULT_QUESTIONS_TOPIC: &str = "questions";

/// Default search index alias.
const DEFAULT_INDEX_ALIAS: &str = "questions";

/// Default HTTP port for the health/search surface.
const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Runtime settings for the search indexer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub kafka_broker: String,
    pub opensearch_url: String,
    pub kafka_group_id: String,
    pub topic: String,
    pub index_alias: String,
    pub index_version: u32,
    pub health_port: u16,
    pub bootstrap: BootstrapConfig,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`: Kafka broker address (**required**)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (**required**)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: questions.search)
    /// - `QUESTIONS_TOPIC`: Topic carrying question events (default: questions)
    /// - `INDEX_ALIAS`: Index alias name (default: questions)
    /// - `QUESTIONS_INDEX_VERSION`: Index version number (default: 0)
    /// - `HEALTH_PORT`: HTTP port for health/search (default: 8080)
    /// - `BOOTSTRAP_STARTUP_DELAY_SECS`: Bootstrap startup delay (default: 5)
    /// - `BOOTSTRAP_MAX_RETRIES`: Bootstrap attempts (default: 5)
    /// - `BOOTSTRAP_RETRY_DELAY_SECS`: Delay between attempts (default: 10)
    pub fn from_env() -> Result<Self, IndexingError> {
        let kafka_broker = env::var("KAFKA_BROKER")
            .map_err(|_| IndexingError::config("KAFKA_BROKER must be set"))?;
        let opensearch_url = env::var("OPENSEARCH_URL")
            .map_err(|_| IndexingError::config("OPENSEARCH_URL must be set"))?;

        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());
        let topic =
            env::var("QUESTIONS_TOPIC").unwrap_or_else(|_| DEFAULT_QUESTIONS_TOPIC.to_string());
        let index_alias =
            env::var("INDEX_ALIAS").unwrap_or_else(|_| DEFAULT_INDEX_ALIAS.to_string());
        let index_version = env::var("QUESTIONS_INDEX_VERSION")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let health_port = env::var("HEALTH_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HEALTH_PORT);

        let defaults = BootstrapConfig::default();
        let bootstrap = BootstrapConfig {
            startup_delay: env_duration_secs("BOOTSTRAP_STARTUP_DELAY_SECS")
                .unwrap_or(defaults.startup_delay),
            max_retries: env::var("BOOTSTRAP_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: env_duration_secs("BOOTSTRAP_RETRY_DELAY_SECS")
                .unwrap_or(defaults.retry_delay),
        };

        Ok(Self {
            kafka_broker,
            opensearch_url,
            kafka_group_id,
            topic,
            index_alias,
            index_version,
            health_port,
            bootstrap,
        })
    }
}

fn env_duration_secs(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
