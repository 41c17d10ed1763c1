// ABOUTME: Candidate artifact validation: existence, size floor, format signature.
// ABOUTME: Invalidity is a reportable outcome, never an error; only infra failures are errors.

use std::sync::Arc;

use super::error::DeployError;
use crate::store::ObjectStore;
use crate::types::Artifact;

/// Outcome of validating one candidate artifact.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub ok: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Pluggable format recognizer, injected rather than hard-coded.
///
/// Implementations inspect the leading bytes of the artifact and report
/// why the format is unacceptable, or nothing if it is recognized.
pub trait FormatCheck: Send + Sync {
    fn check(&self, leading: &[u8]) -> Result<(), String>;
}

/// Accepts every format. The default when no signatures are configured.
#[derive(Debug, Default)]
pub struct AnyFormat;

impl FormatCheck for AnyFormat {
    fn check(&self, _leading: &[u8]) -> Result<(), String> {
        Ok(())
    }
}

/// Recognizes artifacts by magic-byte signatures.
#[derive(Debug)]
pub struct MagicFormatCheck {
    signatures: Vec<(String, Vec<u8>)>,
}

impl MagicFormatCheck {
    /// Known model container signatures, selected by name.
    pub fn for_formats(names: &[String]) -> Result<Self, String> {
        let mut signatures = Vec::new();
        for name in names {
            let magic: &[u8] = match name.as_str() {
                "h5" | "hdf5" => b"\x89HDF\r\n\x1a\n",
                // PyTorch checkpoints are zip containers.
                "pt" | "zip" => b"PK\x03\x04",
                "gguf" => b"GGUF",
                "npy" => b"\x93NUMPY",
                other => return Err(format!("unknown artifact format: {other}")),
            };
            signatures.push((name.clone(), magic.to_vec()));
        }
        Ok(Self { signatures })
    }
}

impl FormatCheck for MagicFormatCheck {
    fn check(&self, leading: &[u8]) -> Result<(), String> {
        for (_, magic) in &self.signatures {
            if leading.starts_with(magic) {
                return Ok(());
            }
        }
        let names: Vec<&str> = self.signatures.iter().map(|(n, _)| n.as_str()).collect();
        Err(format!(
            "no recognized format signature (expected one of: {})",
            names.join(", ")
        ))
    }
}

/// Read-only probe of a candidate artifact before it enters the pipeline.
pub struct ArtifactValidator<S> {
    store: Arc<S>,
    min_size_bytes: u64,
    format: Arc<dyn FormatCheck>,
}

impl<S: ObjectStore> ArtifactValidator<S> {
    pub fn new(store: Arc<S>, min_size_bytes: u64, format: Arc<dyn FormatCheck>) -> Self {
        Self {
            store,
            min_size_bytes,
            format,
        }
    }

    /// Validate one candidate. Rejection is a normal outcome; only
    /// infrastructure failures (storage unreachable) surface as errors.
    pub async fn validate(&self, artifact: &Artifact) -> Result<ValidationResult, DeployError> {
        if !self.store.exists(&artifact.location).await? {
            return Ok(ValidationResult::reject(format!(
                "artifact not found at {}",
                artifact.location
            )));
        }

        let size = self.store.size(&artifact.location).await?;
        if size < self.min_size_bytes {
            return Ok(ValidationResult::reject(format!(
                "size {size} below floor of {} bytes",
                self.min_size_bytes
            )));
        }
        if size != artifact.size_bytes {
            return Ok(ValidationResult::reject(format!(
                "stored size {size} does not match declared size {}",
                artifact.size_bytes
            )));
        }

        let bytes = self.store.read(&artifact.location).await?;
        if let Err(reason) = self.format.check(&bytes) {
            return Ok(ValidationResult::reject(reason));
        }

        tracing::debug!(artifact = %artifact.id, size, "artifact validated");
        Ok(ValidationResult::pass())
    }
}
