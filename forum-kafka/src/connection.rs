//! Broker connection validation with bounded exponential backoff.
//!
//! Services validate their dependencies in the background at startup: the
//! process comes up immediately, and readiness reflects whatever state the
//! monitor has reached. Exhausting all retries marks the dependency
//! [`ConnectionState::Unreachable`]; it never aborts the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

/// Connectivity of a single external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No probe has run yet.
    Unknown,
    /// A probe cycle is in progress.
    Connecting,
    /// The last probe succeeded.
    Connected,
    /// All probe attempts failed.
    Unreachable,
}

impl ConnectionState {
    /// Stable lowercase name for logs and health payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a dependency's connection state plus retry metadata.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Message from the most recent failed probe.
    pub last_error: Option<String>,
    /// Probe attempts made in the current/most recent cycle.
    pub attempts: u32,
}

impl ConnectionStatus {
    fn new() -> Self {
        Self {
            state: ConnectionState::Unknown,
            last_error: None,
            attempts: 0,
        }
    }
}

/// Retry schedule for connection probes.
///
/// The delay before retry `k` is `base_delay * 2^k`, capped at `max_delay`.
/// With the defaults (initial attempt plus 5 retries, base 1s) the observed
/// delays are 2s, 4s, 8s, 16s, 32s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `retry`-th retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor.min(u32::MAX as u64) as u32);
        delay.min(self.max_delay)
    }
}

/// Read-only view of a [`ConnectionMonitor`], handed to health checks.
#[derive(Clone)]
pub struct ConnectionHandle {
    name: Arc<str>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl ConnectionHandle {
    /// Dependency name this handle reports on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status snapshot.
    pub async fn status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    /// Current state only.
    pub async fn state(&self) -> ConnectionState {
        self.status.read().await.state
    }
}

/// Tracks and validates connectivity to one external dependency.
pub struct ConnectionMonitor {
    name: Arc<str>,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl ConnectionMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            status: Arc::new(RwLock::new(ConnectionStatus::new())),
        }
    }

    /// Get a read-only handle for health reporting.
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            name: Arc::clone(&self.name),
            status: Arc::clone(&self.status),
        }
    }

    /// Probe the dependency until it responds or the retry budget is spent.
    ///
    /// Runs `probe` once, then up to `policy.max_retries` more times with
    /// exponential backoff between attempts. Every failure is logged with the
    /// attempt count and the computed delay. The shutdown receiver is observed
    /// during backoff sleeps; on shutdown no further attempts are scheduled
    /// and the current state is returned.
    ///
    /// This function never panics and never returns an error: an exhausted
    /// budget transitions the state to [`ConnectionState::Unreachable`] and
    /// readiness reporting takes it from there.
    pub async fn ensure_reachable<F, Fut>(
        &self,
        probe: F,
        policy: &RetryPolicy,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ConnectionState
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), String>>,
    {
        self.transition(ConnectionState::Connecting, None, 0).await;

        for attempt in 0..=policy.max_retries {
            match probe().await {
                Ok(()) => {
                    info!(target = %self.name, attempts = attempt + 1, "Connection validated");
                    self.transition(ConnectionState::Connected, None, attempt + 1)
                        .await;
                    return ConnectionState::Connected;
                }
                Err(e) => {
                    self.transition(ConnectionState::Connecting, Some(e.clone()), attempt + 1)
                        .await;

                    if attempt == policy.max_retries {
                        break;
                    }

                    let retry = attempt + 1;
                    let delay = policy.delay_for(retry);
                    warn!(
                        target = %self.name,
                        retry = retry,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Connection attempt failed, retrying"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => {
                            info!(target = %self.name, "Shutdown during connection validation");
                            return self.status.read().await.state;
                        }
                    }
                }
            }
        }

        let last_error = self.status.read().await.last_error.clone();
        error!(
            target = %self.name,
            attempts = policy.max_retries + 1,
            error = last_error.as_deref().unwrap_or("unknown"),
            "Dependency unreachable after exhausting retries"
        );
        self.transition(
            ConnectionState::Unreachable,
            last_error,
            policy.max_retries + 1,
        )
        .await;
        ConnectionState::Unreachable
    }

    async fn transition(&self, state: ConnectionState, last_error: Option<String>, attempts: u32) {
        let mut status = self.status.write().await;
        status.state = state;
        status.attempts = attempts;
        status.last_error = last_error;
    }
}
