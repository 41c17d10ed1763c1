// ABOUTME: Append-only deployment log for audit, persisted behind the store.
// ABOUTME: JSON lines, one terminal DeploymentRecord per line; not a stable wire format.

use std::sync::Arc;

use bytes::Bytes;

use super::error::DeployError;
use super::record::DeploymentRecord;
use crate::store::ObjectStore;
use crate::types::StorePath;

/// Append-only log of finished deployment attempts for one slot.
///
/// Writes happen under the slot's deploy lock, so read-modify-write here
/// is race-free.
pub struct DeploymentLog<S> {
    store: Arc<S>,
    path: StorePath,
}

impl<S: ObjectStore> DeploymentLog<S> {
    pub fn new(store: Arc<S>, path: StorePath) -> Self {
        Self { store, path }
    }

    /// Append one terminal record.
    pub async fn append(&self, record: &DeploymentRecord) -> Result<(), DeployError> {
        let mut contents = match self.store.read(&self.path).await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let line = serde_json::to_vec(record)
            .map_err(|e| DeployError::StorageUnavailable(e.to_string()))?;
        contents.extend_from_slice(&line);
        contents.push(b'\n');

        self.store.write(&self.path, Bytes::from(contents)).await?;
        Ok(())
    }

    /// All recorded attempts, oldest first. Unparsable lines are skipped
    /// with a warning rather than poisoning the whole history.
    pub async fn entries(&self) -> Result<Vec<DeploymentRecord>, DeployError> {
        let bytes = match self.store.read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in bytes.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(error = %e, "skipping unparsable audit log line"),
            }
        }
        Ok(records)
    }
}
