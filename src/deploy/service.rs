// ABOUTME: Service controller: restart the serving process and poll it healthy.
// ABOUTME: Health checking is bounded by a caller-supplied timeout budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::error::DeployError;
use crate::supervisor::{ProcessSupervisor, SupervisorError};

/// Result of a bounded health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
}

/// Drives the serving process through the supervisor collaborator.
pub struct ServiceController<P> {
    supervisor: Arc<P>,
    service: String,
    poll_interval: Duration,
}

impl<P: ProcessSupervisor> ServiceController<P> {
    pub fn new(supervisor: Arc<P>, service: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            supervisor,
            service: service.into(),
            poll_interval,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Signal the serving process to restart so it picks up the new
    /// production slot contents.
    pub async fn restart(&self) -> Result<(), DeployError> {
        self.supervisor
            .restart(&self.service)
            .await
            .map_err(|e| DeployError::RestartFailed(e.to_string()))
    }

    /// Poll the liveness probe until it reports healthy or `budget`
    /// elapses. An unhealthy outcome is a normal result, not an error;
    /// probe errors count as unhealthy rounds.
    pub async fn health_check(&self, budget: Duration) -> HealthStatus {
        let deadline = Instant::now() + budget;

        loop {
            match self.supervisor.probe(&self.service).await {
                Ok(true) => return HealthStatus { healthy: true },
                Ok(false) => {
                    tracing::debug!(service = %self.service, "probe reported unhealthy");
                }
                Err(SupervisorError::ProbeFailed { reason, .. }) => {
                    tracing::warn!(service = %self.service, reason = %reason, "probe errored, treating as unhealthy");
                }
                Err(e) => {
                    tracing::warn!(service = %self.service, error = %e, "probe errored, treating as unhealthy");
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                return HealthStatus { healthy: false };
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
