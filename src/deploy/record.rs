// ABOUTME: Deployment state machine states and the externally observable record.
// ABOUTME: Transitions are monotonic; the orchestrator is the record's only mutator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Artifact, DeploymentId};

/// The states one deployment attempt moves through.
///
/// The happy path runs `Pending` through `Succeeded` in order. Any active
/// state may divert into `RollingBack`, which terminates in `RolledBack`
/// on success or `Failed` if the compensation itself fails. `Failed` is
/// also reached directly from `Validating` (rejection touches nothing, so
/// there is nothing to roll back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentState {
    Pending,
    Validating,
    Staged,
    AwaitingAcceptance,
    BackingUp,
    Promoting,
    Restarting,
    HealthChecking,
    Succeeded,
    RollingBack,
    RolledBack,
    Failed,
}

impl DeploymentState {
    /// Whether this state ends the deployment.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentState::Succeeded | DeploymentState::RolledBack | DeploymentState::Failed
        )
    }

    /// The legal transition relation. No transition skips a required
    /// predecessor, and terminal states have no successors.
    pub fn can_advance_to(self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        match (self, next) {
            (Pending, Validating) => true,
            (Validating, Staged) => true,
            // Rejection before anything was touched; also infra failure
            // while validating or staging.
            (Validating, Failed) => true,
            (Staged, AwaitingAcceptance) => true,
            (AwaitingAcceptance, BackingUp) => true,
            (BackingUp, Promoting) => true,
            (Promoting, Restarting) => true,
            (Restarting, HealthChecking) => true,
            (HealthChecking, Succeeded) => true,
            // The failure branch is reachable from every post-staging
            // active state.
            (AwaitingAcceptance | BackingUp | Promoting | Restarting | HealthChecking, RollingBack) => {
                true
            }
            (RollingBack, RolledBack) => true,
            (RollingBack, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One attempt to deploy an artifact: the pipeline's externally observable
/// result.
///
/// Owned exclusively by the orchestrator while in flight; callers receive
/// it once a terminal state is reached. `failure_reason` is the single
/// channel through which callers learn what went wrong.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployment_id: DeploymentId,
    pub artifact: Artifact,
    pub started_at: DateTime<Utc>,
    pub state: DeploymentState,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl DeploymentRecord {
    pub fn new(deployment_id: DeploymentId, artifact: Artifact) -> Self {
        Self {
            deployment_id,
            artifact,
            started_at: Utc::now(),
            state: DeploymentState::Pending,
            finished_at: None,
            failure_reason: None,
        }
    }

    /// Advance to the next state. The orchestrator hardwires the call
    /// sites, so an illegal transition is a bug, not a runtime condition.
    pub(crate) fn advance(&mut self, next: DeploymentState) {
        assert!(
            self.state.can_advance_to(next),
            "illegal deployment state transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            deployment = %self.deployment_id,
            from = %self.state,
            to = %next,
            "state transition"
        );
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    /// Advance into a terminal state carrying the failure reason.
    pub(crate) fn finish_failed(&mut self, terminal: DeploymentState, reason: String) {
        debug_assert!(terminal.is_terminal());
        self.failure_reason = Some(reason);
        self.advance(terminal);
    }

    pub fn succeeded(&self) -> bool {
        self.state == DeploymentState::Succeeded
    }
}
