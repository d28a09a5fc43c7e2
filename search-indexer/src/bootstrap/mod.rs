//! Index bootstrap background task.
//!
//! Ensures the questions index exists before projections can land. Runs
//! detached from the request path: the service starts immediately, waits a
//! short startup delay, then retries a bounded number of times. Exhausting
//! the retries leaves the service running with search degraded - the health
//! surface reports the missing index, the process never crashes over it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use search_indexer_repository::{EnsureOutcome, SearchIndexProvider};

/// Configuration for the bootstrap task.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Delay before the first attempt, so startup is never blocked.
    pub startup_delay: Duration,
    /// Maximum number of ensure attempts.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(5),
            max_retries: 5,
            retry_delay: Duration::from_secs(10),
        }
    }
}

/// Run the index bootstrap until the index is ensured, the retry budget is
/// spent, or shutdown is signalled.
///
/// Returns the ensure outcome if one was reached, `None` otherwise.
#[instrument(skip(provider, config, shutdown))]
pub async fn run(
    provider: Arc<dyn SearchIndexProvider>,
    config: BootstrapConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Option<EnsureOutcome> {
    tokio::select! {
        _ = tokio::time::sleep(config.startup_delay) => {}
        _ = shutdown.recv() => {
            info!("Shutdown before index bootstrap started");
            return None;
        }
    }

    info!("Ensuring search index exists");

    for attempt in 1..=config.max_retries {
        match provider.ensure_index_exists().await {
            Ok(outcome) => {
                match outcome {
                    EnsureOutcome::Ready => info!(attempt, "Search index already exists"),
                    EnsureOutcome::Created => info!(attempt, "Search index created"),
                }
                return Some(outcome);
            }
            Err(e) => {
                error!(
                    attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Failed to ensure search index"
                );

                if attempt < config.max_retries {
                    info!(
                        delay_secs = config.retry_delay.as_secs(),
                        "Retrying index bootstrap"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(config.retry_delay) => {}
                        _ = shutdown.recv() => {
                            info!("Shutdown during index bootstrap");
                            return None;
                        }
                    }
                }
            }
        }
    }

    error!(
        max_retries = config.max_retries,
        "Exhausted index bootstrap retries; service continues with search degraded"
    );
    None
}
