// ABOUTME: Immutable reference to one trained model file.
// ABOUTME: Carries identity, store location, size, and SHA-256 checksum.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ArtifactId, StorePath};

/// A reference to a model file produced by upstream training.
///
/// Immutable once created: the pipeline never mutates an artifact, it only
/// copies its bytes between store locations and verifies the checksum on
/// the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub location: StorePath,
    pub size_bytes: u64,
    pub checksum: String,
}

impl Artifact {
    pub fn new(
        id: ArtifactId,
        location: StorePath,
        size_bytes: u64,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id,
            location,
            size_bytes,
            checksum: checksum.into(),
        }
    }

    /// Compute the SHA-256 hex digest of a byte slice.
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Check whether `bytes` match this artifact's recorded checksum.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Self::digest(bytes) == self.checksum
    }

    /// Derive a copy of this artifact addressed at a different location.
    /// Identity, size, and checksum are unchanged: same bytes, new home.
    pub fn relocated(&self, location: StorePath) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }
}
