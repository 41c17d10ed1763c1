// ABOUTME: Staging area: isolated holding location for candidates pending promotion.
// ABOUTME: Staging copies are keyed per deployment id and re-verified by checksum.

use std::sync::Arc;

use super::error::DeployError;
use crate::store::ObjectStore;
use crate::types::{Artifact, DeploymentId, StorePath};

/// Handle to one staged artifact copy.
///
/// Holds the staged location until the promoter takes it or the
/// orchestrator discards it. Discarding twice is a no-op.
#[derive(Debug)]
pub struct StagingHandle {
    deployment_id: DeploymentId,
    staged: Artifact,
    discarded: bool,
}

impl StagingHandle {
    /// The staged artifact, byte-identical to the validated candidate.
    pub fn staged(&self) -> &Artifact {
        &self.staged
    }

    pub fn deployment_id(&self) -> &DeploymentId {
        &self.deployment_id
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }
}

/// Isolated holding area for candidate artifacts, invisible to the
/// serving process.
pub struct StagingArea<S> {
    store: Arc<S>,
    root: StorePath,
}

impl<S: ObjectStore> StagingArea<S> {
    pub fn new(store: Arc<S>, root: StorePath) -> Self {
        Self { store, root }
    }

    fn staged_path(&self, deployment_id: &DeploymentId) -> Result<StorePath, DeployError> {
        self.root
            .join(&format!("{deployment_id}.artifact"))
            .map_err(|e| DeployError::StorageUnavailable(e.to_string()))
    }

    /// Copy the candidate into staging and re-verify its checksum.
    ///
    /// Fails with `StagingConflict` if a copy already exists for this
    /// deployment id, and with `IntegrityMismatch` (after cleaning up the
    /// partial copy) if the staged bytes diverge from the candidate.
    pub async fn stage(
        &self,
        artifact: &Artifact,
        deployment_id: &DeploymentId,
    ) -> Result<StagingHandle, DeployError> {
        let dst = self.staged_path(deployment_id)?;

        if self.store.exists(&dst).await? {
            return Err(DeployError::StagingConflict(deployment_id.to_string()));
        }

        self.store.copy(&artifact.location, &dst).await?;

        let staged_bytes = self.store.read(&dst).await?;
        if !artifact.matches(&staged_bytes) {
            // Partial or corrupted copy; leave nothing behind.
            self.store.delete(&dst).await?;
            return Err(DeployError::IntegrityMismatch(format!(
                "staged copy of {} failed checksum re-verification",
                artifact.id
            )));
        }

        tracing::info!(
            deployment = %deployment_id,
            artifact = %artifact.id,
            staged_at = %dst,
            "artifact staged"
        );

        Ok(StagingHandle {
            deployment_id: deployment_id.clone(),
            staged: artifact.relocated(dst),
            discarded: false,
        })
    }

    /// Release staging resources. Idempotent: discarding an
    /// already-discarded handle is a no-op, not an error.
    pub async fn discard(&self, handle: &mut StagingHandle) -> Result<(), DeployError> {
        if handle.discarded {
            return Ok(());
        }
        self.store.delete(&handle.staged.location).await?;
        handle.discarded = true;
        tracing::debug!(deployment = %handle.deployment_id, "staging discarded");
        Ok(())
    }
}
