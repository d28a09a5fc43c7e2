//! Orchestrator module for the search indexer ingest.
//!
//! Coordinates the consumer, projector, and loader components.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, instrument, warn};

use question_events::QuestionEvent;

use crate::consumer::StreamMessage;
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::projector::QuestionProjector;

/// Source of question events for the orchestrator.
///
/// The production implementation is the Kafka consumer; tests provide mocks.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the event source.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Run the consume loop, sending batches through `sender` and committing
    /// them when a successful acknowledgment arrives on `ack_receiver`.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Manages the lifecycle of ingest components
/// - Routes batches from the consumer through projection and loading
/// - Acknowledges (or refuses to acknowledge) each batch based on the outcome
/// - Handles shutdown signals
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    projector: QuestionProjector,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of events processed since startup.
    total_events_processed: Arc<AtomicU64>,
    /// Total number of document mutations applied since startup.
    total_mutations_applied: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        projector: QuestionProjector,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(consumer, projector, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        projector: QuestionProjector,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            projector,
            loader,
            config,
            shutdown_tx,
            total_events_processed: Arc::new(AtomicU64::new(0)),
            total_mutations_applied: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The shutdown channel shared by every background task of this service.
    ///
    /// Background tasks (connection validation, index bootstrap, the HTTP
    /// server) subscribe to it so one ctrl-c winds everything down.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the orchestrator.
    ///
    /// This method starts the consumer and coordinates message flow. It
    /// blocks until a shutdown signal is received or the stream ends.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting search indexer orchestrator");

        self.consumer.subscribe()?;

        // Create event channel
        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Create acknowledgment channel
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        info!("Ready to process question events");

        // Progress logging timer (every 10 seconds)
        let total_events = Arc::clone(&self.total_events_processed);
        let total_mutations = Arc::clone(&self.total_mutations_applied);
        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        progress_timer.tick().await;

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { events, offsets }) => {
                            debug!(
                                event_count = events.len(),
                                offset_count = offsets.len(),
                                "Received events from consumer"
                            );
                            match self.process_events(events).await {
                                Ok(()) => {
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: true,
                                        error: None,
                                    }).await;
                                }
                                Err(e) => {
                                    error!(error = %e, "Failed to process events; withholding acknowledgment for redelivery");
                                    let _ = ack_transmitter.send(StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }).await;
                                }
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    info!(
                        events_processed = total_events.load(Ordering::Relaxed),
                        mutations_applied = total_mutations.load(Ordering::Relaxed),
                        "Processing progress"
                    );
                }
            }
        }

        // Unacknowledged batches are not committed; the broker redelivers
        // them on the next startup (at-least-once delivery semantics).
        let _ = consumer_handle.await;

        info!(
            total_events_processed = self.total_events_processed.load(Ordering::Relaxed),
            total_mutations_applied = self.total_mutations_applied.load(Ordering::Relaxed),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Process a batch of events through projection and loading.
    ///
    /// Returns Ok only after every mutation has been applied to the engine;
    /// the caller must acknowledge to the broker based on this result.
    async fn process_events(&mut self, events: Vec<QuestionEvent>) -> Result<(), IngestError> {
        let event_count = events.len();
        self.total_events_processed
            .fetch_add(event_count as u64, Ordering::Relaxed);

        debug!(event_count = event_count, "Processing batch of events");

        let mutations = self.projector.project_batch(events)?;

        if mutations.is_empty() {
            debug!("No mutations to apply after projection");
            return Ok(());
        }

        let mutation_count = mutations.len();
        self.loader.apply(mutations).await?;

        self.total_mutations_applied
            .fetch_add(mutation_count as u64, Ordering::Relaxed);

        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
