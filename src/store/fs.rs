// ABOUTME: Filesystem-backed object store rooted at a single directory.
// ABOUTME: atomic_rename maps to rename(2), which is atomic within one filesystem.

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ObjectStore, StoreError};
use crate::types::StorePath;

/// Object store over a local directory tree.
///
/// `StorePath` validation guarantees paths cannot escape the root, so the
/// plain join below is safe. All objects must live on the same filesystem
/// for the rename-based atomicity guarantee to hold.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &StorePath) -> PathBuf {
        self.root.join(path.as_str())
    }

    fn map_err(path: &StorePath, err: std::io::Error) -> StoreError {
        if err.kind() == ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_string(),
            }
        } else {
            StoreError::Io {
                path: path.to_string(),
                source: err,
            }
        }
    }

    async fn ensure_parent(&self, target: &Path, path: &StorePath) -> Result<(), StoreError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::map_err(path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn read(&self, path: &StorePath) -> Result<Bytes, StoreError> {
        let bytes = tokio::fs::read(self.resolve(path))
            .await
            .map_err(|e| Self::map_err(path, e))?;
        Ok(Bytes::from(bytes))
    }

    async fn write(&self, path: &StorePath, bytes: Bytes) -> Result<(), StoreError> {
        let target = self.resolve(path);
        self.ensure_parent(&target, path).await?;
        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| Self::map_err(path, e))
    }

    async fn copy(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        let target = self.resolve(dst);
        self.ensure_parent(&target, dst).await?;
        tokio::fs::copy(self.resolve(src), &target)
            .await
            .map_err(|e| Self::map_err(src, e))?;
        Ok(())
    }

    async fn atomic_rename(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        let target = self.resolve(dst);
        self.ensure_parent(&target, dst).await?;
        tokio::fs::rename(self.resolve(src), &target)
            .await
            .map_err(|e| Self::map_err(src, e))
    }

    async fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_err(path, e)),
        }
    }

    async fn size(&self, path: &StorePath) -> Result<u64, StoreError> {
        let meta = tokio::fs::metadata(self.resolve(path))
            .await
            .map_err(|e| Self::map_err(path, e))?;
        Ok(meta.len())
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_err(path, e)),
        }
    }
}
