// ABOUTME: ProductionSlot pointer and the Promoter that swaps it atomically.
// ABOUTME: Readers always observe a complete pointer: the old value or the new one.

use std::sync::Arc;

use bytes::Bytes;

use super::error::DeployError;
use crate::store::{ObjectStore, StoreError};
use crate::types::{Artifact, StorePath};

/// The single source of truth for "what is currently serving".
///
/// The slot is one JSON object behind the store; every update goes through
/// a write-to-temp plus atomic rename, so a concurrent reader sees exactly
/// the previous artifact or the next one. Never empty after the first
/// successful deployment.
pub struct ProductionSlot<S> {
    store: Arc<S>,
    root: StorePath,
}

// Manual Clone: the derive would demand S: Clone, but only the Arc is
// cloned.
impl<S> Clone for ProductionSlot<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            root: self.root.clone(),
        }
    }
}

impl<S: ObjectStore> ProductionSlot<S> {
    pub fn new(store: Arc<S>, root: StorePath) -> Self {
        Self { store, root }
    }

    fn pointer(&self) -> Result<StorePath, StoreError> {
        self.root.join("slot.json").map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })
    }

    fn staging_pointer(&self) -> Result<StorePath, StoreError> {
        self.root
            .join("slot.json.next")
            .map_err(|e| StoreError::Unavailable {
                reason: e.to_string(),
            })
    }

    /// The artifact currently serving traffic, or `None` before the first
    /// successful deployment.
    pub async fn current(&self) -> Result<Option<Artifact>, DeployError> {
        let pointer = self.pointer()?;
        let bytes = match self.store.read(&pointer).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let artifact = serde_json::from_slice(&bytes).map_err(|e| {
            DeployError::StorageUnavailable(format!("corrupted slot pointer: {e}"))
        })?;
        Ok(Some(artifact))
    }

    /// Point the slot at `artifact` via one atomic rename.
    pub(crate) async fn install(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })?;
        let staged = self.staging_pointer()?;
        self.store.write(&staged, Bytes::from(bytes)).await?;
        self.store.atomic_rename(&staged, &self.pointer()?).await
    }
}

/// Performs the production slot update. The only writer of the slot.
pub struct Promoter<S> {
    store: Arc<S>,
    slot: ProductionSlot<S>,
    blob_root: StorePath,
}

impl<S: ObjectStore> Promoter<S> {
    pub fn new(store: Arc<S>, slot: ProductionSlot<S>, blob_root: StorePath) -> Self {
        Self {
            store,
            slot,
            blob_root,
        }
    }

    /// Swap the staged artifact into the production slot.
    ///
    /// The staged bytes are first made durable under the production tree
    /// (so staging can be discarded afterwards), then the pointer is
    /// updated in a single atomic operation. Returns the promoted
    /// artifact, addressed at its durable location.
    pub async fn swap(&self, staged: &Artifact) -> Result<Artifact, DeployError> {
        let blob = self
            .blob_root
            .join(&format!("{}.bin", staged.id))
            .map_err(|e| DeployError::SwapFailed(e.to_string()))?;

        // Idempotent prep: a retried swap reuses the blob it already copied.
        let durable = self
            .store
            .exists(&blob)
            .await
            .map_err(|e| DeployError::SwapFailed(e.to_string()))?;
        if !durable {
            self.store
                .copy(&staged.location, &blob)
                .await
                .map_err(|e| DeployError::SwapFailed(e.to_string()))?;
        }

        let promoted = staged.relocated(blob);
        self.slot
            .install(&promoted)
            .await
            .map_err(|e| DeployError::SwapFailed(e.to_string()))?;

        tracing::info!(artifact = %promoted.id, "promoted to production slot");
        Ok(promoted)
    }

    /// Point the slot back at a previously promoted artifact. Used during
    /// rollback; the target's blob is already durable.
    pub async fn restore(&self, previous: &Artifact) -> Result<(), DeployError> {
        self.slot
            .install(previous)
            .await
            .map_err(|e| DeployError::SwapFailed(e.to_string()))?;
        tracing::info!(artifact = %previous.id, "production slot restored");
        Ok(())
    }
}
