// ABOUTME: Backup manager: snapshots the production artifact before each promotion.
// ABOUTME: Keeps an ordered, bounded index; the newest entry is the rollback target.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use super::error::DeployError;
use super::slot::ProductionSlot;
use crate::store::{ObjectStore, StoreError};
use crate::types::{Artifact, BackupId, StorePath};

/// A retained copy of a previously-production artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub backup_id: BackupId,
    pub artifact: Artifact,
    pub created_at: DateTime<Utc>,
}

/// Manages the ordered backup index for one slot.
///
/// `backup_current` runs immediately before each promotion, so the most
/// recent entry always reflects the artifact that was in production just
/// before the current attempt. Entries are pruned oldest-first.
pub struct BackupManager<S> {
    store: Arc<S>,
    root: StorePath,
}

impl<S: ObjectStore> BackupManager<S> {
    pub fn new(store: Arc<S>, root: StorePath) -> Self {
        Self { store, root }
    }

    fn index_path(&self) -> Result<StorePath, StoreError> {
        self.root.join("index.json").map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })
    }

    async fn load_index(&self) -> Result<Vec<BackupEntry>, DeployError> {
        let path = self.index_path()?;
        let bytes = match self.store.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            DeployError::StorageUnavailable(format!("corrupted backup index: {e}"))
        })
    }

    async fn save_index(&self, entries: &[BackupEntry]) -> Result<(), DeployError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| DeployError::StorageUnavailable(e.to_string()))?;
        let staged = self
            .root
            .join("index.json.next")
            .map_err(|e| DeployError::StorageUnavailable(e.to_string()))?;
        self.store.write(&staged, Bytes::from(bytes)).await?;
        self.store.atomic_rename(&staged, &self.index_path()?).await?;
        Ok(())
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<BackupEntry>, DeployError> {
        self.load_index().await
    }

    /// Snapshot the current production artifact before a promotion.
    ///
    /// Returns `None` when the slot is empty (first-ever deployment): a
    /// no-op, not an error. The returned entry is the rollback target
    /// pinned to the deployment that requested it.
    pub async fn backup_current(
        &self,
        slot: &ProductionSlot<S>,
    ) -> Result<Option<BackupEntry>, DeployError> {
        let Some(current) = slot.current().await? else {
            tracing::info!("production slot empty, nothing to back up (first deployment)");
            return Ok(None);
        };

        let mut entries = self.load_index().await?;

        // Backups form a total order per slot; nudge forward if the wall
        // clock has not advanced past the previous entry.
        let now = Utc::now();
        let created_at = match entries.last() {
            Some(last) if last.created_at >= now => last.created_at + ChronoDuration::milliseconds(1),
            _ => now,
        };

        let entry = BackupEntry {
            backup_id: BackupId::new(format!(
                "{}-{}",
                created_at.format("%Y%m%dt%H%M%S%3f"),
                current.id
            )),
            artifact: current,
            created_at,
        };

        entries.push(entry.clone());
        self.save_index(&entries).await?;

        tracing::info!(backup = %entry.backup_id, artifact = %entry.artifact.id, "backed up production artifact");
        Ok(Some(entry))
    }

    /// The most recent entry's artifact, for rollback paths that were not
    /// pinned at backup time (manual rollback).
    pub async fn restore_latest(&self) -> Result<Artifact, DeployError> {
        let entries = self.load_index().await?;
        entries
            .last()
            .map(|entry| entry.artifact.clone())
            .ok_or(DeployError::NoBackupAvailable)
    }

    /// Enforce the retention policy, evicting oldest entries beyond
    /// `retain`.
    ///
    /// Never evicts the most recent entry, never evicts `pinned` (the
    /// in-flight rollback target), and never deletes a blob still
    /// referenced by the slot or a surviving entry.
    pub async fn prune(
        &self,
        retain: usize,
        slot: &ProductionSlot<S>,
        pinned: Option<&BackupId>,
    ) -> Result<(), DeployError> {
        let retain = retain.max(1);
        let entries = self.load_index().await?;
        if entries.len() <= retain {
            return Ok(());
        }

        let excess = entries.len() - retain;
        let mut evicted = Vec::new();
        let mut kept = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let is_latest = i == entries.len() - 1;
            let is_pinned = pinned.is_some_and(|id| *id == entry.backup_id);
            if evicted.len() < excess && !is_latest && !is_pinned {
                evicted.push(entry.clone());
            } else {
                kept.push(entry.clone());
            }
        }

        self.save_index(&kept).await?;

        let slot_location = slot.current().await?.map(|a| a.location);
        for entry in evicted {
            let referenced_elsewhere = kept.iter().any(|k| k.artifact.location == entry.artifact.location)
                || slot_location.as_ref() == Some(&entry.artifact.location);
            if !referenced_elsewhere {
                self.store.delete(&entry.artifact.location).await?;
            }
            tracing::debug!(backup = %entry.backup_id, "pruned backup entry");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::slot::Promoter;
    use crate::store::MemoryStore;
    use crate::types::ArtifactId;

    struct Fixture {
        store: Arc<MemoryStore>,
        slot: ProductionSlot<MemoryStore>,
        promoter: Promoter<MemoryStore>,
        backups: BackupManager<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let slot = ProductionSlot::new(store.clone(), StorePath::parse("production/web").unwrap());
        let promoter = Promoter::new(
            store.clone(),
            slot.clone(),
            StorePath::parse("production/web/blobs").unwrap(),
        );
        let backups = BackupManager::new(store.clone(), StorePath::parse("backups/web").unwrap());
        Fixture {
            store,
            slot,
            promoter,
            backups,
        }
    }

    async fn promote(fx: &Fixture, id: &str, bytes: &'static [u8]) -> Artifact {
        let location = StorePath::parse(&format!("staging/web/{id}.artifact")).unwrap();
        fx.store.write(&location, Bytes::from_static(bytes)).await.unwrap();
        let staged = Artifact::new(
            ArtifactId::new(id),
            location,
            bytes.len() as u64,
            Artifact::digest(bytes),
        );
        fx.promoter.swap(&staged).await.unwrap()
    }

    #[tokio::test]
    async fn empty_slot_backup_is_noop() {
        let fx = fixture();
        let entry = fx.backups.backup_current(&fx.slot).await.unwrap();
        assert!(entry.is_none());
        assert!(fx.backups.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backup_reflects_value_before_promotion() {
        let fx = fixture();
        let first = promote(&fx, "m1", b"weights-v1").await;

        let entry = fx.backups.backup_current(&fx.slot).await.unwrap().unwrap();
        assert_eq!(entry.artifact, first);

        promote(&fx, "m2", b"weights-v2").await;
        let latest = fx.backups.restore_latest().await.unwrap();
        assert_eq!(latest, first);
    }

    #[tokio::test]
    async fn restore_latest_without_backups_fails() {
        let fx = fixture();
        let err = fx.backups.restore_latest().await.unwrap_err();
        assert!(matches!(err, DeployError::NoBackupAvailable));
    }

    #[tokio::test]
    async fn created_at_strictly_increases() {
        let fx = fixture();
        promote(&fx, "m1", b"v1").await;
        fx.backups.backup_current(&fx.slot).await.unwrap();
        promote(&fx, "m2", b"v2").await;
        fx.backups.backup_current(&fx.slot).await.unwrap();
        promote(&fx, "m3", b"v3").await;
        fx.backups.backup_current(&fx.slot).await.unwrap();

        let entries = fx.backups.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        for pair in entries.windows(2) {
            assert!(pair[1].created_at > pair[0].created_at);
        }
    }

    /// Backup-then-promote, the order the orchestrator uses. Four
    /// promotions yield three entries: the first backup ran on an empty
    /// slot and was a no-op.
    async fn deploy_four(fx: &Fixture) {
        for (id, bytes) in [("m1", b"v1" as &'static [u8]), ("m2", b"v2"), ("m3", b"v3"), ("m4", b"v4")] {
            fx.backups.backup_current(&fx.slot).await.unwrap();
            promote(fx, id, bytes).await;
        }
    }

    #[tokio::test]
    async fn prune_evicts_oldest_first_and_keeps_latest() {
        let fx = fixture();
        deploy_four(&fx).await;
        let before = fx.backups.entries().await.unwrap();
        assert_eq!(before.len(), 3);

        fx.backups.prune(2, &fx.slot, None).await.unwrap();
        let after = fx.backups.entries().await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after.last(), before.last());
        assert_eq!(after[0], before[1]);
    }

    #[tokio::test]
    async fn prune_never_evicts_pinned_entry() {
        let fx = fixture();
        deploy_four(&fx).await;
        let entries = fx.backups.entries().await.unwrap();
        let pinned = entries[0].backup_id.clone();

        fx.backups.prune(1, &fx.slot, Some(&pinned)).await.unwrap();
        let after = fx.backups.entries().await.unwrap();
        assert!(after.iter().any(|e| e.backup_id == pinned));
        assert_eq!(after.last(), entries.last());
    }

    #[tokio::test]
    async fn prune_deletes_unreferenced_blobs_only() {
        let fx = fixture();
        deploy_four(&fx).await;
        let entries = fx.backups.entries().await.unwrap();
        let oldest_blob = entries[0].artifact.location.clone();

        fx.backups.prune(2, &fx.slot, None).await.unwrap();
        assert!(!fx.store.exists(&oldest_blob).await.unwrap());

        // Current slot blob untouched.
        let current = fx.slot.current().await.unwrap().unwrap();
        assert!(fx.store.exists(&current.location).await.unwrap());
    }
}
