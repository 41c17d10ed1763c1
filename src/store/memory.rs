// ABOUTME: In-memory object store for tests and local experiments.
// ABOUTME: A single mutex over the object map makes every operation atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{ObjectStore, StoreError};
use crate::types::StorePath;

/// Object store backed by a `HashMap` behind one mutex.
///
/// Because each operation holds the lock for its full duration, renames are
/// trivially atomic: a concurrent reader sees the map before or after the
/// move, never between remove and insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects. Test helper.
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }

    /// List stored object paths. Test helper.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Bytes, StoreError> {
        self.objects
            .lock()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write(&self, path: &StorePath, bytes: Bytes) -> Result<(), StoreError> {
        self.objects.lock().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn copy(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        let mut objects = self.objects.lock();
        let bytes = objects
            .get(src.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: src.to_string(),
            })?;
        objects.insert(dst.to_string(), bytes);
        Ok(())
    }

    async fn atomic_rename(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        let mut objects = self.objects.lock();
        let bytes = objects
            .remove(src.as_str())
            .ok_or_else(|| StoreError::NotFound {
                path: src.to_string(),
            })?;
        objects.insert(dst.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        Ok(self.objects.lock().contains_key(path.as_str()))
    }

    async fn size(&self, path: &StorePath) -> Result<u64, StoreError> {
        self.objects
            .lock()
            .get(path.as_str())
            .map(|b| b.len() as u64)
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        self.objects.lock().remove(path.as_str());
        Ok(())
    }
}
