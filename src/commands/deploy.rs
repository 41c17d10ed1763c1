// ABOUTME: Deploy command implementation.
// ABOUTME: Imports a local model file into the store and runs the orchestrator.

use std::path::Path;

use bytes::Bytes;

use relevo::config::Config;
use relevo::deploy::{DeployErrorKind, DeploymentState};
use relevo::diagnostics::{Diagnostics, Warning};
use relevo::error::{Error, Result};
use relevo::output::Output;
use relevo::store::ObjectStore;
use relevo::types::{Artifact, ArtifactId, StorePath};

use super::build_orchestrator;

/// Deploy a local model file to the configured slot.
pub async fn deploy(config: Config, artifact_path: &Path, mut output: Output) -> Result<()> {
    output.start_timer();

    let orchestrator = build_orchestrator(&config)?;
    let mut diag = Diagnostics::default();

    if let Some(acceptance) = &config.acceptance
        && !acceptance.script.is_file()
    {
        // The hook fails closed; say so up front instead of mid-pipeline.
        diag.warn(Warning::acceptance_script(format!(
            "acceptance script not found: {}",
            acceptance.script.display()
        )));
    }
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.progress(&format!(
        "Deploying {} to slot {}",
        artifact_path.display(),
        config.slot
    ));

    output.progress("  → Importing artifact into store...");
    let store = relevo::store::FsStore::new(&config.store);
    let artifact = import_artifact(&store, artifact_path).await?;
    output.progress(&format!(
        "  → Artifact {} ({} bytes, sha256 {})",
        artifact.id,
        artifact.size_bytes,
        &artifact.checksum[..12]
    ));

    output.progress("  → Running deployment pipeline...");
    let record = orchestrator.deploy(artifact, config.deploy_options()).await;

    match record.state {
        DeploymentState::Succeeded => {
            output.success(&format!(
                "Deployed {} to {} ({})",
                record.artifact.id, config.slot, record.deployment_id
            ));
            Ok(())
        }
        DeploymentState::RolledBack => {
            // An expected outcome of a well-defined process: the previous
            // artifact is serving again.
            let reason = record.failure_reason.unwrap_or_default();
            output.progress(&format!("Rolled back: {reason}"));
            Err(Error::DeploymentFailed {
                state: record.state,
                reason,
            })
        }
        _ => {
            let reason = record.failure_reason.unwrap_or_default();
            if reason.starts_with(&DeployErrorKind::RollbackFailed.to_string()) {
                // Production may be inconsistent. Loud by design.
                output.error(&format!(
                    "ROLLBACK FAILED for slot {}; manual intervention required",
                    config.slot
                ));
            }
            Err(Error::DeploymentFailed {
                state: record.state,
                reason,
            })
        }
    }
}

/// Copy a local file into the store's incoming area and describe it as an
/// Artifact.
async fn import_artifact<S: ObjectStore>(store: &S, path: &Path) -> Result<Artifact> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| Error::ArtifactNotFound(path.to_path_buf()))?;

    let checksum = Artifact::digest(&bytes);
    let id = ArtifactId::new(format!("{}-{}", sanitize_stem(path), &checksum[..8]));

    let location = StorePath::parse(&format!("incoming/{id}.bin"))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let size_bytes = bytes.len() as u64;
    store
        .write(&location, Bytes::from(bytes))
        .await
        .map_err(|e| Error::Store(format!("failed to import artifact: {e}")))?;

    Ok(Artifact::new(id, location, size_bytes, checksum))
}

/// Reduce a file stem to the character set store paths allow.
fn sanitize_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "artifact".to_string());

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}
