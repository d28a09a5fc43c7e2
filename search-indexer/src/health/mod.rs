//! Health surface for the search indexer.
//!
//! Aggregates dependency probes into liveness/readiness signals. Every check
//! performs a fresh probe per invocation, bounded by a timeout - health never
//! reports a stale cached flag.

pub mod checks;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;

pub use routes::{router, serve, AppState};

/// Default bound on a single dependency probe.
const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 5;

/// Classification of a dependency's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Dependency fully operational.
    Healthy,
    /// Dependency reachable but not fully functional (e.g., index absent).
    Degraded,
    /// Dependency unreachable.
    Unhealthy,
}

impl HealthStatus {
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }

    /// The worse of two statuses.
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Result of one dependency probe.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub status: HealthStatus,
    pub detail: Option<String>,
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            detail: None,
            error: Some(error.into()),
        }
    }
}

/// A named, taggable dependency probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Stable check name used in reports.
    fn name(&self) -> &str;

    /// Tags this check belongs to (readiness uses the "ready" tag).
    fn tags(&self) -> &[&'static str];

    /// Perform a fresh probe.
    async fn check(&self) -> CheckOutcome;
}

/// Report entry for a single check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub name: String,
    pub status: HealthStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tags: Vec<String>,
}

/// Aggregated health report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<CheckReport>,
}

impl HealthReport {
    pub fn is_unhealthy(&self) -> bool {
        self.status == HealthStatus::Unhealthy
    }
}

/// Holds the service's health checks and runs them on demand.
pub struct HealthRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
    check_timeout: Duration,
}

impl HealthRegistry {
    pub fn new(checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self {
            checks,
            check_timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    /// Run every registered check.
    pub async fn run_all(&self) -> HealthReport {
        self.run_filtered(|_| true).await
    }

    /// Run only the checks carrying the given tag.
    pub async fn run_tagged(&self, tag: &str) -> HealthReport {
        self.run_filtered(|check| check.tags().contains(&tag)).await
    }

    async fn run_filtered<F>(&self, filter: F) -> HealthReport
    where
        F: Fn(&dyn HealthCheck) -> bool,
    {
        let mut reports = Vec::new();
        let mut overall = HealthStatus::Healthy;

        for check in self.checks.iter().filter(|c| filter(c.as_ref())) {
            let started = std::time::Instant::now();
            let outcome = match timeout(self.check_timeout, check.check()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(check = check.name(), timeout_secs = self.check_timeout.as_secs(), "Health check timed out");
                    CheckOutcome::unhealthy(format!(
                        "check timed out after {}s",
                        self.check_timeout.as_secs()
                    ))
                }
            };

            overall = overall.worst(outcome.status);
            reports.push(CheckReport {
                name: check.name().to_string(),
                status: outcome.status,
                duration_ms: started.elapsed().as_millis() as u64,
                detail: outcome.detail,
                error: outcome.error,
                tags: check.tags().iter().map(|t| t.to_string()).collect(),
            });
        }

        HealthReport {
            status: overall,
            checks: reports,
        }
    }
}
