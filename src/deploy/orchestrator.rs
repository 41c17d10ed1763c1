// ABOUTME: The deployment orchestrator: one state machine per deploy call.
// ABOUTME: Owns retry and rollback policy; every failure becomes a recorded transition.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;

use super::acceptance::AcceptanceHook;
use super::audit::DeploymentLog;
use super::backup::{BackupEntry, BackupManager};
use super::error::DeployError;
use super::lock::{LockInfo, SlotLocks};
use super::record::{DeploymentRecord, DeploymentState};
use super::service::ServiceController;
use super::slot::{ProductionSlot, Promoter};
use super::staging::{StagingArea, StagingHandle};
use super::validator::{ArtifactValidator, FormatCheck};
use crate::store::ObjectStore;
use crate::supervisor::ProcessSupervisor;
use crate::types::{Artifact, DeploymentId, SlotName, StorePath};

/// Monotonic suffix keeping deployment ids unique within one process even
/// when the clock stands still.
static DEPLOY_SEQ: AtomicU64 = AtomicU64::new(0);

/// Per-deployment policy knobs.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Budget for the external acceptance-test hook.
    pub acceptance_timeout: Duration,
    /// Budget for the post-restart health check (and the rollback one).
    pub health_check_timeout: Duration,
    /// How many backup entries to retain after a successful backup.
    pub retain_backups: usize,
    /// Attempts for the production slot swap before escalating to rollback.
    pub swap_retries: u32,
    /// Attempts for the serving process restart before escalating.
    pub restart_retries: u32,
    /// Budget for each storage-touching pipeline step.
    pub store_timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            acceptance_timeout: Duration::from_secs(120),
            health_check_timeout: Duration::from_secs(60),
            retain_backups: 5,
            swap_retries: 3,
            restart_retries: 2,
            store_timeout: Duration::from_secs(30),
        }
    }
}

/// Static wiring for one slot's pipeline.
pub struct PipelineSettings {
    /// Reject candidates smaller than this.
    pub min_artifact_bytes: u64,
    /// Injected format recognizer.
    pub format: Arc<dyn FormatCheck>,
    /// Service name handed to the process supervisor.
    pub service: String,
    /// Interval between health probes.
    pub poll_interval: Duration,
}

/// Snapshot of a slot for status output.
#[derive(Debug)]
pub struct SlotStatus {
    pub slot: SlotName,
    pub current: Option<Artifact>,
    pub backups: Vec<BackupEntry>,
    pub lock_holder: Option<LockInfo>,
}

/// Coordinates validator, staging, backups, promoter, and service control
/// for one production slot.
///
/// `deploy` is the externally observable operation: it blocks until the
/// returned record reaches a terminal state. Component failures never
/// escape as faults; they become transitions with a recorded
/// `failure_reason`.
pub struct DeploymentOrchestrator<S, P> {
    slot_name: SlotName,
    validator: ArtifactValidator<S>,
    staging: StagingArea<S>,
    backups: BackupManager<S>,
    slot: ProductionSlot<S>,
    promoter: Promoter<S>,
    service: ServiceController<P>,
    acceptance: Arc<dyn AcceptanceHook>,
    audit: DeploymentLog<S>,
    locks: Arc<SlotLocks>,
}

impl<S: ObjectStore, P: ProcessSupervisor> DeploymentOrchestrator<S, P> {
    pub fn new(
        slot_name: SlotName,
        store: Arc<S>,
        supervisor: Arc<P>,
        acceptance: Arc<dyn AcceptanceHook>,
        settings: PipelineSettings,
        locks: Arc<SlotLocks>,
    ) -> Self {
        let layout = |prefix: &str| {
            StorePath::parse(&format!("{prefix}/{slot_name}"))
                .expect("slot name is always a valid store path segment")
        };

        let slot = ProductionSlot::new(Arc::clone(&store), layout("production"));
        let blob_root = layout("production")
            .join("blobs")
            .expect("static segment is valid");

        Self {
            validator: ArtifactValidator::new(
                Arc::clone(&store),
                settings.min_artifact_bytes,
                settings.format,
            ),
            staging: StagingArea::new(Arc::clone(&store), layout("staging")),
            backups: BackupManager::new(Arc::clone(&store), layout("backups")),
            promoter: Promoter::new(Arc::clone(&store), slot.clone(), blob_root),
            service: ServiceController::new(supervisor, settings.service, settings.poll_interval),
            audit: DeploymentLog::new(
                store,
                StorePath::parse(&format!("audit/{slot_name}.log"))
                    .expect("slot name is always a valid store path segment"),
            ),
            slot,
            acceptance,
            locks,
            slot_name,
        }
    }

    pub fn slot_name(&self) -> &SlotName {
        &self.slot_name
    }

    fn next_deployment_id(&self) -> DeploymentId {
        let seq = DEPLOY_SEQ.fetch_add(1, Ordering::Relaxed);
        DeploymentId::new(format!(
            "{}-{}-{:04}",
            self.slot_name,
            Utc::now().format("%Y%m%dt%H%M%S%3f"),
            seq % 10_000
        ))
    }

    /// Wrap a storage-touching step in its timeout budget. Exceeding the
    /// budget is treated identically to an explicit failure of that step.
    async fn bounded<T>(
        &self,
        budget: Duration,
        what: &str,
        fut: impl Future<Output = Result<T, DeployError>>,
    ) -> Result<T, DeployError> {
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(DeployError::StorageUnavailable(format!(
                "{what} exceeded its {}s budget",
                budget.as_secs()
            ))),
        }
    }

    /// Deploy one artifact to this slot, blocking until a terminal state.
    ///
    /// Deployments to the same slot are strictly serialized: the slot lock
    /// is held for the lifetime of this call.
    pub async fn deploy(&self, artifact: Artifact, opts: DeployOptions) -> DeploymentRecord {
        let _guard = self.locks.acquire(&self.slot_name).await;

        let deployment_id = self.next_deployment_id();
        tracing::info!(
            deployment = %deployment_id,
            slot = %self.slot_name,
            artifact = %artifact.id,
            "starting deployment"
        );

        let mut record = DeploymentRecord::new(deployment_id, artifact);
        self.run_pipeline(&mut record, &opts).await;

        if let Err(e) = self.audit.append(&record).await {
            tracing::warn!(error = %e, "failed to append deployment record to audit log");
        }

        tracing::info!(
            deployment = %record.deployment_id,
            state = %record.state,
            reason = record.failure_reason.as_deref().unwrap_or("-"),
            "deployment finished"
        );
        record
    }

    async fn run_pipeline(&self, record: &mut DeploymentRecord, opts: &DeployOptions) {
        use DeploymentState::*;

        // Validate. Rejection touches nothing, so there is no rollback:
        // the record goes straight to Failed.
        record.advance(Validating);
        let verdict = match self
            .bounded(
                opts.store_timeout,
                "validation",
                self.validator.validate(&record.artifact),
            )
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => return record.finish_failed(Failed, e.failure_reason()),
        };
        if !verdict.ok {
            let err = DeployError::ValidationRejected(
                verdict.reason.unwrap_or_else(|| "rejected".to_string()),
            );
            return record.finish_failed(Failed, err.failure_reason());
        }

        // Stage. The staging area cleans up its own partial copies, so a
        // failure here also ends cleanly without compensation.
        let mut handle = match self
            .bounded(
                opts.store_timeout,
                "staging",
                self.staging.stage(&record.artifact, &record.deployment_id),
            )
            .await
        {
            Ok(handle) => handle,
            Err(e) => return record.finish_failed(Failed, e.failure_reason()),
        };
        record.advance(Staged);

        // Acceptance. A failure or timeout here rolls back the lightweight
        // way: production was never touched, only staging is discarded.
        record.advance(AwaitingAcceptance);
        match tokio::time::timeout(opts.acceptance_timeout, self.acceptance.run(handle.staged()))
            .await
        {
            Ok(outcome) if outcome.pass => {}
            Ok(outcome) => {
                return self
                    .rollback_staging_only(
                        record,
                        &mut handle,
                        DeployError::AcceptanceFailed(outcome.details),
                    )
                    .await;
            }
            Err(_elapsed) => {
                return self
                    .rollback_staging_only(
                        record,
                        &mut handle,
                        DeployError::AcceptanceTimeout(opts.acceptance_timeout.as_secs()),
                    )
                    .await;
            }
        }

        // Backup. The returned entry is this deployment's pinned rollback
        // target; later deployments cannot change it.
        record.advance(BackingUp);
        let pinned = match self
            .bounded(
                opts.store_timeout,
                "backup",
                self.backups.backup_current(&self.slot),
            )
            .await
        {
            Ok(pinned) => pinned,
            Err(e) => return self.rollback_staging_only(record, &mut handle, e).await,
        };

        if let Err(e) = self
            .bounded(
                opts.store_timeout,
                "backup pruning",
                self.backups.prune(
                    opts.retain_backups,
                    &self.slot,
                    pinned.as_ref().map(|p| &p.backup_id),
                ),
            )
            .await
        {
            // Retention is enforced again on the next deployment; an
            // over-full index is not worth failing a deploy.
            tracing::warn!(error = %e, "backup pruning failed");
        }

        // Promote, retrying the swap up to the configured bound.
        record.advance(Promoting);
        let mut promoted = None;
        for attempt in 1..=opts.swap_retries.max(1) {
            match self
                .bounded(
                    opts.store_timeout,
                    "slot swap",
                    self.promoter.swap(handle.staged()),
                )
                .await
            {
                Ok(artifact) => {
                    promoted = Some(artifact);
                    break;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "slot swap attempt failed");
                    if attempt == opts.swap_retries.max(1) {
                        return self.rollback_full(record, &mut handle, pinned, e, opts).await;
                    }
                }
            }
        }
        let promoted = promoted.expect("loop either promoted or returned");

        // Restart the serving process, retrying up to the bound.
        record.advance(Restarting);
        let mut restart_err = None;
        for attempt in 1..=opts.restart_retries.max(1) {
            match self.service.restart().await {
                Ok(()) => {
                    restart_err = None;
                    break;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "restart attempt failed");
                    restart_err = Some(e);
                }
            }
        }
        if let Some(e) = restart_err {
            return self.rollback_full(record, &mut handle, pinned, e, opts).await;
        }

        // Health check the freshly restarted process.
        record.advance(HealthChecking);
        let status = self.service.health_check(opts.health_check_timeout).await;
        if !status.healthy {
            return self
                .rollback_full(
                    record,
                    &mut handle,
                    pinned,
                    DeployError::health_timeout(opts.health_check_timeout),
                    opts,
                )
                .await;
        }

        // Success: the staged copy served its purpose.
        if let Err(e) = self.staging.discard(&mut handle).await {
            tracing::warn!(error = %e, "failed to discard staging after success");
        }
        tracing::info!(artifact = %promoted.id, slot = %self.slot_name, "deployment succeeded");
        record.advance(Succeeded);
    }

    /// Lightweight rollback: nothing in production changed yet, so
    /// compensation only discards staging.
    async fn rollback_staging_only(
        &self,
        record: &mut DeploymentRecord,
        handle: &mut StagingHandle,
        cause: DeployError,
    ) {
        use DeploymentState::*;

        tracing::info!(
            deployment = %record.deployment_id,
            cause = %cause,
            "rolling back (staging only)"
        );
        record.advance(RollingBack);

        match self.staging.discard(handle).await {
            Ok(()) => record.finish_failed(RolledBack, cause.failure_reason()),
            Err(e) => {
                let err = DeployError::RollbackFailed(format!("failed to discard staging: {e}"));
                tracing::error!(deployment = %record.deployment_id, error = %err, "rollback failed");
                record.finish_failed(Failed, compound_reason(&err, &cause));
            }
        }
    }

    /// Full rollback: restore the pinned backup, restart, and verify
    /// health. The only path to the hard-failure terminal.
    async fn rollback_full(
        &self,
        record: &mut DeploymentRecord,
        handle: &mut StagingHandle,
        pinned: Option<BackupEntry>,
        cause: DeployError,
        opts: &DeployOptions,
    ) {
        use DeploymentState::*;

        tracing::warn!(
            deployment = %record.deployment_id,
            cause = %cause,
            "rolling back promotion"
        );
        record.advance(RollingBack);

        let Some(entry) = pinned else {
            // First-ever deployment failed after promotion: there is no
            // prior artifact to restore. Human escalation.
            let err = DeployError::NoBackupAvailable;
            tracing::error!(
                deployment = %record.deployment_id,
                slot = %self.slot_name,
                "rollback impossible: no backup exists; production slot may be unhealthy"
            );
            return record.finish_failed(Failed, compound_reason(&err, &cause));
        };

        match self.execute_rollback(&entry, handle, opts).await {
            Ok(()) => {
                tracing::info!(
                    deployment = %record.deployment_id,
                    restored = %entry.artifact.id,
                    "rollback complete"
                );
                record.finish_failed(RolledBack, cause.failure_reason());
            }
            Err(e) => {
                let err = DeployError::RollbackFailed(e.to_string());
                tracing::error!(
                    deployment = %record.deployment_id,
                    slot = %self.slot_name,
                    error = %err,
                    "rollback failed; production may be inconsistent"
                );
                record.finish_failed(Failed, compound_reason(&err, &cause));
            }
        }
    }

    async fn execute_rollback(
        &self,
        entry: &BackupEntry,
        handle: &mut StagingHandle,
        opts: &DeployOptions,
    ) -> Result<(), DeployError> {
        self.promoter.restore(&entry.artifact).await?;
        self.service.restart().await?;

        let status = self.service.health_check(opts.health_check_timeout).await;
        if !status.healthy {
            return Err(DeployError::health_timeout(opts.health_check_timeout));
        }

        self.staging.discard(handle).await?;
        Ok(())
    }

    /// Manual rollback to the most recent backup, outside any deployment.
    ///
    /// Serialized against deployments via the same slot lock.
    pub async fn rollback_to_latest(&self, opts: &DeployOptions) -> Result<Artifact, DeployError> {
        let _guard = self.locks.acquire(&self.slot_name).await;

        let previous = self.backups.restore_latest().await?;
        tracing::info!(slot = %self.slot_name, artifact = %previous.id, "manual rollback");

        self.promoter.restore(&previous).await?;
        self.service.restart().await?;

        let status = self.service.health_check(opts.health_check_timeout).await;
        if !status.healthy {
            return Err(DeployError::RollbackFailed(format!(
                "service unhealthy after restoring {}",
                previous.id
            )));
        }
        Ok(previous)
    }

    /// Current slot contents, backup inventory, and lock holder.
    pub async fn status(&self) -> Result<SlotStatus, DeployError> {
        Ok(SlotStatus {
            slot: self.slot_name.clone(),
            current: self.slot.current().await?,
            backups: self.backups.entries().await?,
            lock_holder: self.locks.holder(&self.slot_name),
        })
    }

    /// The audit log: every finished attempt, oldest first.
    pub async fn history(&self) -> Result<Vec<DeploymentRecord>, DeployError> {
        self.audit.entries().await
    }
}

/// Failure reason when the compensation itself failed: the rollback error
/// leads, the original cause is preserved in parentheses.
fn compound_reason(rollback_err: &DeployError, cause: &DeployError) -> String {
    format!(
        "{} (while compensating for: {})",
        rollback_err.failure_reason(),
        cause.failure_reason()
    )
}
