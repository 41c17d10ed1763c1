// ABOUTME: Error taxonomy for the deployment pipeline.
// ABOUTME: Every failure the orchestrator reinterprets as a state transition lives here.

use std::time::Duration;

use crate::store::StoreError;
use crate::supervisor::SupervisorError;

/// Errors that can occur during deployment pipeline steps.
///
/// These never escape `deploy()` as faults: the orchestrator catches each
/// one and reinterprets it as a state transition, recording
/// `failure_reason` on the deployment record. Only `RollbackFailed` is
/// surfaced loudly, since production may be left inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The validator rejected the candidate artifact. No side effects.
    #[error("artifact rejected: {0}")]
    ValidationRejected(String),

    /// The storage collaborator is unreachable or failed an operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A staging copy already exists for this deployment id.
    #[error("staging already in progress for deployment {0}")]
    StagingConflict(String),

    /// The staged copy does not match the validated artifact's checksum.
    #[error("staged artifact diverges from source: {0}")]
    IntegrityMismatch(String),

    /// The acceptance-test hook reported failure.
    #[error("acceptance tests failed: {0}")]
    AcceptanceFailed(String),

    /// The acceptance-test hook did not finish within its budget.
    #[error("acceptance tests timed out after {0} seconds")]
    AcceptanceTimeout(u64),

    /// The production slot swap was rejected by the store.
    #[error("production slot swap failed: {0}")]
    SwapFailed(String),

    /// The serving process could not be restarted.
    #[error("serving process restart failed: {0}")]
    RestartFailed(String),

    /// The serving process never reported healthy within the budget.
    #[error("health check failed: {0}")]
    HealthCheckFailed(String),

    /// No backup exists to restore. Only possible when a first-ever
    /// deployment fails after promotion.
    #[error("no backup available to restore")]
    NoBackupAvailable,

    /// The compensating rollback itself failed. Human intervention needed.
    #[error("rollback failed: {0}")]
    RollbackFailed(String),
}

/// Error kind for programmatic handling and failure-reason bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    ValidationRejected,
    StorageUnavailable,
    StagingConflict,
    IntegrityMismatch,
    AcceptanceFailed,
    SwapFailed,
    RestartFailed,
    HealthCheckFailed,
    NoBackupAvailable,
    RollbackFailed,
}

impl std::fmt::Display for DeployErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeployErrorKind::ValidationRejected => "ValidationRejected",
            DeployErrorKind::StorageUnavailable => "StorageUnavailable",
            DeployErrorKind::StagingConflict => "StagingConflict",
            DeployErrorKind::IntegrityMismatch => "IntegrityMismatch",
            DeployErrorKind::AcceptanceFailed => "AcceptanceFailed",
            DeployErrorKind::SwapFailed => "SwapFailed",
            DeployErrorKind::RestartFailed => "RestartFailed",
            DeployErrorKind::HealthCheckFailed => "HealthCheckFailed",
            DeployErrorKind::NoBackupAvailable => "NoBackupAvailable",
            DeployErrorKind::RollbackFailed => "RollbackFailed",
        };
        write!(f, "{name}")
    }
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::ValidationRejected(_) => DeployErrorKind::ValidationRejected,
            DeployError::StorageUnavailable(_) => DeployErrorKind::StorageUnavailable,
            DeployError::StagingConflict(_) => DeployErrorKind::StagingConflict,
            DeployError::IntegrityMismatch(_) => DeployErrorKind::IntegrityMismatch,
            DeployError::AcceptanceFailed(_) | DeployError::AcceptanceTimeout(_) => {
                DeployErrorKind::AcceptanceFailed
            }
            DeployError::SwapFailed(_) => DeployErrorKind::SwapFailed,
            DeployError::RestartFailed(_) => DeployErrorKind::RestartFailed,
            DeployError::HealthCheckFailed(_) => DeployErrorKind::HealthCheckFailed,
            DeployError::NoBackupAvailable => DeployErrorKind::NoBackupAvailable,
            DeployError::RollbackFailed(_) => DeployErrorKind::RollbackFailed,
        }
    }

    /// The single-channel failure reason recorded on the deployment record:
    /// the kind token followed by the specifics.
    pub fn failure_reason(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }

    /// A health check that ran out of budget.
    pub fn health_timeout(timeout: Duration) -> Self {
        DeployError::HealthCheckFailed(format!(
            "no healthy probe within {} seconds",
            timeout.as_secs()
        ))
    }
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        DeployError::StorageUnavailable(err.to_string())
    }
}

impl From<SupervisorError> for DeployError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::RestartFailed { .. } => DeployError::RestartFailed(err.to_string()),
            SupervisorError::ProbeFailed { .. } | SupervisorError::Spawn(_) => {
                DeployError::HealthCheckFailed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_leads_with_kind_token() {
        let err = DeployError::ValidationRejected("below size floor".to_string());
        let reason = err.failure_reason();
        assert!(reason.starts_with("ValidationRejected: "));
        assert!(reason.contains("below size floor"));
    }

    #[test]
    fn acceptance_timeout_shares_kind_with_failure() {
        assert_eq!(
            DeployError::AcceptanceTimeout(30).kind(),
            DeployErrorKind::AcceptanceFailed
        );
    }
}
