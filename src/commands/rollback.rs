// ABOUTME: Rollback command implementation.
// ABOUTME: Restores the most recent backup to production and verifies health.

use relevo::config::Config;
use relevo::error::{Error, Result};
use relevo::output::Output;

use super::build_orchestrator;

/// Restore the most recent backup to the configured slot.
pub async fn rollback(config: Config, mut output: Output) -> Result<()> {
    output.start_timer();

    let orchestrator = build_orchestrator(&config)?;

    output.progress(&format!("Rolling back slot {}...", config.slot));

    let restored = orchestrator
        .rollback_to_latest(&config.deploy_options())
        .await
        .map_err(|e| Error::Rollback(e.to_string()))?;

    output.success(&format!("Restored {} to {}", restored.id, config.slot));
    Ok(())
}
