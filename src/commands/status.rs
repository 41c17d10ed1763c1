// ABOUTME: Status and history command implementations.
// ABOUTME: Reads the slot pointer, backup index, and audit log without touching them.

use relevo::config::Config;
use relevo::diagnostics::{Diagnostics, Warning};
use relevo::error::{Error, Result};
use relevo::output::Output;

use super::build_orchestrator;

/// Show the production slot, backup inventory, and any in-flight lock.
pub async fn status(config: Config, output: Output) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;

    let status = orchestrator
        .status()
        .await
        .map_err(|e| Error::Store(e.to_string()))?;

    match &status.current {
        Some(artifact) => {
            output.progress(&format!("Slot {}: serving {}", status.slot, artifact.id));
            output.progress(&format!(
                "  location: {}  size: {} bytes  sha256: {}",
                artifact.location,
                artifact.size_bytes,
                &artifact.checksum[..12.min(artifact.checksum.len())]
            ));
        }
        None => {
            output.progress(&format!("Slot {}: empty (never deployed)", status.slot));
        }
    }

    let mut diag = Diagnostics::default();
    if let Some(holder) = &status.lock_holder {
        diag.warn(Warning::in_flight_deployment(format!(
            "deployment in flight: held by {} (pid {}) since {}",
            holder.holder, holder.pid, holder.acquired_at
        )));
    }
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.progress(&format!("Backups: {}", status.backups.len()));
    for entry in status.backups.iter().rev() {
        output.progress(&format!(
            "  {}  {}  {}",
            entry.created_at, entry.backup_id, entry.artifact.id
        ));
    }

    Ok(())
}

/// Print past deployment attempts, oldest first.
pub async fn history(config: Config, limit: Option<usize>, output: Output) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;

    let mut records = orchestrator
        .history()
        .await
        .map_err(|e| Error::Store(e.to_string()))?;

    if let Some(limit) = limit {
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }

    if records.is_empty() {
        output.progress("No deployments recorded.");
        return Ok(());
    }

    for record in &records {
        let reason = record
            .failure_reason
            .as_deref()
            .map(|r| format!("  {r}"))
            .unwrap_or_default();
        output.progress(&format!(
            "{}  {}  {}  {}{}",
            record.started_at, record.deployment_id, record.artifact.id, record.state, reason
        ));
    }

    Ok(())
}
