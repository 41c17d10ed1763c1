// ABOUTME: Process supervisor collaborator for the serving process.
// ABOUTME: Narrow contract: restart a named service and probe its liveness.

mod command;

pub use command::CommandSupervisor;

use async_trait::async_trait;
use thiserror::Error;

/// Wraps whatever service manager is in use.
///
/// The pipeline only depends on this narrow contract: it can ask the
/// supervisor to restart the serving process so it picks up the new
/// production slot contents, and it can ask whether the process is healthy.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Signal the serving process to reload/restart.
    async fn restart(&self, service: &str) -> Result<(), SupervisorError>;

    /// Probe the serving process once. `true` means healthy right now.
    async fn probe(&self, service: &str) -> Result<bool, SupervisorError>;
}

/// Errors from supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to restart service {service}: {reason}")]
    RestartFailed { service: String, reason: String },

    #[error("failed to probe service {service}: {reason}")]
    ProbeFailed { service: String, reason: String },

    #[error("failed to spawn supervisor command: {0}")]
    Spawn(#[from] std::io::Error),
}
