//! # Question Publisher
//!
//! Producer side of the question search pipeline: emits one domain event to
//! the durable `questions` topic for every committed question mutation.
//!
//! The publisher makes exactly one delivery attempt per event and never
//! retries locally. Failures propagate to the caller, whose transaction
//! policy decides between rolling back and logging-and-continuing. A failed
//! publish after a committed write is an index-consistency gap and is logged
//! as such; it must never be turned into a user-facing mutation failure.

use std::env;
use std::time::Duration;

use rdkafka::producer::{FutureProducer, FutureRecord};
use thiserror::Error;
use tracing::{error, info};

use forum_kafka::ProducerConfig;
use question_events::QuestionEvent;

/// Default topic that question events are published to.
pub const DEFAULT_QUESTIONS_TOPIC: &str = "questions";

/// Default bound on a single enqueue-plus-delivery attempt.
const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 5000;

/// Errors from event publication.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Required configuration absent at startup. Fatal: the hosting service
    /// must not start without a broker address.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The event could not be handed to the broker.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The event could not be serialized to its wire form.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PublishError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportUnavailable(msg.into())
    }
}

/// Configuration for the event publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Kafka broker address.
    pub broker: String,
    /// Topic to publish question events to.
    pub topic: String,
    /// Client id reported to the broker.
    pub client_id: String,
    /// Upper bound for a single delivery attempt.
    pub delivery_timeout: Duration,
}

impl PublisherConfig {
    pub fn new(broker: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            topic: topic.into(),
            client_id: "question-publisher".to_string(),
            delivery_timeout: Duration::from_millis(DEFAULT_DELIVERY_TIMEOUT_MS),
        }
    }

    /// Build configuration from environment variables.
    ///
    /// `KAFKA_BROKER` is required; `QUESTIONS_TOPIC` defaults to
    /// [`DEFAULT_QUESTIONS_TOPIC`].
    pub fn from_env() -> Result<Self, PublishError> {
        let broker = env::var("KAFKA_BROKER")
            .map_err(|_| PublishError::config("KAFKA_BROKER must be set"))?;
        let topic =
            env::var("QUESTIONS_TOPIC").unwrap_or_else(|_| DEFAULT_QUESTIONS_TOPIC.to_string());

        Ok(Self::new(broker, topic))
    }
}

/// Publishes question domain events to the durable questions topic.
pub struct EventPublisher {
    producer: FutureProducer,
    topic: String,
    delivery_timeout: Duration,
}

impl EventPublisher {
    /// Create a publisher from explicit configuration.
    pub fn new(config: PublisherConfig) -> Result<Self, PublishError> {
        let producer_config = ProducerConfig::from_env(&config.broker, config.client_id.clone());
        let producer = forum_kafka::create_producer_with_config(&producer_config)
            .map_err(|e| PublishError::transport(e.to_string()))?;

        info!(
            broker = %config.broker,
            topic = %config.topic,
            "Created event publisher"
        );

        Ok(Self {
            producer,
            topic: config.topic,
            delivery_timeout: config.delivery_timeout,
        })
    }

    /// Create a publisher from environment variables.
    pub fn from_env() -> Result<Self, PublishError> {
        Self::new(PublisherConfig::from_env()?)
    }

    /// Serialize an event into its message key and JSON payload.
    fn record_parts(event: &QuestionEvent) -> Result<(String, String), PublishError> {
        let key = event.partition_key().to_string();
        let payload = serde_json::to_string(event)
            .map_err(|e| PublishError::SerializationError(e.to_string()))?;
        Ok((key, payload))
    }

    /// Publish one event, keyed by the mutated question's id.
    ///
    /// Call this only after the primary store has durably committed the
    /// mutation, so no event is ever advertised for a write that did not
    /// persist. One attempt, no local retry: an `Err` means the index will
    /// be stale for this question until a later event or a backfill repairs
    /// it, and the caller decides how loudly to fail.
    pub async fn publish(&self, event: &QuestionEvent) -> Result<(), PublishError> {
        let (key, payload) = Self::record_parts(event)?;

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

        match self.producer.send(record, self.delivery_timeout).await {
            Ok((partition, offset)) => {
                info!(
                    event = event.name(),
                    question_id = %key,
                    partition = partition,
                    offset = offset,
                    "Published question event"
                );
                Ok(())
            }
            Err((e, _)) => {
                error!(
                    event = event.name(),
                    question_id = %key,
                    error = %e,
                    "Failed to publish question event; search index is now stale for this question"
                );
                Err(PublishError::transport(e.to_string()))
            }
        }
    }
}
