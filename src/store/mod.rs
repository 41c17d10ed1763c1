// ABOUTME: Storage collaborator trait for artifacts, staging copies, and backups.
// ABOUTME: Defines ObjectStore plus the unified StoreError with a kind() accessor.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use snafu::Snafu;

use crate::types::StorePath;

/// The minimum primitive set the pipeline requires from persistent storage.
///
/// Any object store or filesystem satisfying these is acceptable. The one
/// hard requirement is `atomic_rename`: a reader concurrent with the rename
/// must observe either the old object at `dst` or the new one, never a mix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the full contents of an object.
    async fn read(&self, path: &StorePath) -> Result<Bytes, StoreError>;

    /// Write an object, replacing any existing contents.
    async fn write(&self, path: &StorePath, bytes: Bytes) -> Result<(), StoreError>;

    /// Copy an object to a new location within the store.
    async fn copy(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError>;

    /// Atomically move `src` over `dst`, replacing it.
    async fn atomic_rename(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError>;

    /// Whether an object exists at `path`.
    async fn exists(&self, path: &StorePath) -> Result<bool, StoreError>;

    /// Size in bytes of the object at `path`.
    async fn size(&self, path: &StorePath) -> Result<u64, StoreError>;

    /// Delete the object at `path`. Deleting a missing object is a no-op.
    async fn delete(&self, path: &StorePath) -> Result<(), StoreError>;
}

/// Unified store error for programmatic handling across backends.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("object not found: {path}"))]
    NotFound { path: String },

    #[snafu(display("I/O failure on {path}: {source}"))]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("store unavailable: {reason}"))]
    Unavailable { reason: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The addressed object does not exist.
    NotFound,
    /// The backend failed an I/O operation.
    Io,
    /// The backend is unreachable or refused the operation.
    Unavailable,
}

impl StoreError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::NotFound { .. } => StoreErrorKind::NotFound,
            StoreError::Io { .. } => StoreErrorKind::Io,
            StoreError::Unavailable { .. } => StoreErrorKind::Unavailable,
        }
    }

    /// Whether this error means "the object is not there" rather than
    /// "the store is broken".
    pub fn is_not_found(&self) -> bool {
        self.kind() == StoreErrorKind::NotFound
    }
}
