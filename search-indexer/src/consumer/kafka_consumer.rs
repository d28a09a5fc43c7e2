//! Kafka consumer implementation for the search indexer.
//!
//! Consumes question events from the questions topic and forwards them to the
//! ingest. Offsets are committed only after the orchestrator acknowledges a
//! batch, so an unacknowledged batch is redelivered from the last committed
//! offset on restart (at-least-once).

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer as RdConsumer, StreamConsumer},
    message::Message as KafkaMessage,
    TopicPartitionList,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use question_events::QuestionEvent;

use crate::consumer::messages::StreamMessage;
use crate::errors::IngestError;
use crate::orchestrator::Consumer;

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// Kafka consumer for question events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID; this is the service's durable
    ///   subscription and must be distinct from the topic name
    /// * `topic` - The questions topic to subscribe to
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, IngestError> {
        Self::with_batch_config(
            brokers,
            group_id,
            topic,
            DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_TIMEOUT_MS,
        )
    }

    /// Create a new Kafka consumer with custom batch configuration.
    pub fn with_batch_config(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
        batch_timeout_ms: u64,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout_ms,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            batch_size,
            batch_timeout: Duration::from_millis(batch_timeout_ms),
        })
    }

    /// Parse a Kafka message payload into a question event.
    ///
    /// Returns `Ok(None)` for empty payloads.
    fn parse_message(
        &self,
        msg: &rdkafka::message::BorrowedMessage<'_>,
    ) -> Result<Option<QuestionEvent>, IngestError> {
        let payload = match msg.payload() {
            Some(p) => p,
            None => {
                debug!("Received message with empty payload");
                return Ok(None);
            }
        };

        let event: QuestionEvent = serde_json::from_slice(payload).map_err(|e| {
            IngestError::parse(format!("Failed to decode question event: {}", e))
        })?;

        debug!(
            event = event.name(),
            question_id = %event.partition_key(),
            partition = msg.partition(),
            offset = msg.offset(),
            "Decoded question event"
        );

        Ok(Some(event))
    }

    /// Flush a batch of events to the channel.
    async fn flush_batch(
        &self,
        batch: &mut Vec<QuestionEvent>,
        offsets: &mut Vec<(String, i32, i64)>,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }

        info!(
            event_count = batch.len(),
            offset_count = offsets.len(),
            "Sending batch of events to projector"
        );

        sender
            .send(StreamMessage::Events {
                events: std::mem::take(batch),
                offsets: std::mem::take(offsets),
            })
            .await
            .map_err(|e| IngestError::ChannelError(e.to_string()))?;

        Ok(())
    }

    /// Commit offsets for an acknowledged batch.
    async fn commit_offsets(&self, offsets: &[(String, i32, i64)]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, rdkafka::Offset::Offset(offset + 1))
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topic = %self.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Start consuming messages and send them through the channel.
    ///
    /// Messages are batched before being sent. Offsets for a batch are
    /// committed only when the orchestrator reports success for it.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batch: Vec<QuestionEvent> = Vec::with_capacity(self.batch_size);
        let mut pending_offsets: Vec<(String, i32, i64)> = Vec::new();
        let mut flush_timer = tokio::time::interval(self.batch_timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Don't flush pending messages - they haven't been committed
                    // and will be re-read from the last committed offset on restart
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                // Handle acknowledgments from orchestrator
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            if success {
                                if let Err(e) = self.commit_offsets(&offsets).await {
                                    error!(error = %e, "Failed to commit offsets after acknowledgment");
                                } else {
                                    debug!(offset_count = offsets.len(), "Committed offsets after successful processing");
                                }
                            } else {
                                error!(
                                    offset_count = offsets.len(),
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Not committing offsets due to processing failure"
                                );
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {
                            // Ignore other message types
                        }
                    }
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            match self.parse_message(&msg) {
                                Ok(Some(event)) => {
                                    batch.push(event);
                                    pending_offsets.push((msg.topic().to_string(), msg.partition(), msg.offset()));

                                    // Flush if batch is full
                                    if batch.len() >= self.batch_size {
                                        self.flush_batch(&mut batch, &mut pending_offsets, &sender).await?;
                                    }
                                }
                                Ok(None) => {
                                    // Empty payload carries no work; commit so it is
                                    // not re-read on restart
                                    let mut tpl = TopicPartitionList::new();
                                    tpl.add_partition_offset(
                                        msg.topic(),
                                        msg.partition(),
                                        rdkafka::Offset::Offset(msg.offset() + 1)
                                    )
                                    .map_err(|e| IngestError::kafka(e.to_string()))?;
                                    self.consumer
                                        .commit(&tpl, rdkafka::consumer::CommitMode::Async)
                                        .map_err(|e| IngestError::kafka(e.to_string()))?;
                                }
                                Err(e) => {
                                    error!(
                                        topic = %msg.topic(),
                                        partition = msg.partition(),
                                        offset = msg.offset(),
                                        error = %e,
                                        "Failed to parse message"
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            self.flush_batch(&mut batch, &mut pending_offsets, &sender).await?;
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    // Flush if timeout reached and we have pending messages
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Flushing batch due to timeout");
                        self.flush_batch(&mut batch, &mut pending_offsets, &sender).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
