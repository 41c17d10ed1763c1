// ABOUTME: Acceptance-test hook: a caller-supplied capability run against the staged artifact.
// ABOUTME: Includes a script-based implementation for the CLI; the orchestrator owns the timeout.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::types::Artifact;

/// What the acceptance tests reported.
#[derive(Debug, Clone)]
pub struct AcceptanceOutcome {
    pub pass: bool,
    pub details: String,
}

impl AcceptanceOutcome {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            pass: true,
            details: details.into(),
        }
    }

    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            pass: false,
            details: details.into(),
        }
    }
}

/// Caller-supplied acceptance capability.
///
/// The orchestrator does not implement test logic itself; it runs this
/// hook against the staged artifact, bounded by the configured timeout.
#[async_trait]
pub trait AcceptanceHook: Send + Sync {
    async fn run(&self, staged: &Artifact) -> AcceptanceOutcome;
}

/// Hook that accepts everything. Used when no acceptance step is
/// configured.
#[derive(Debug, Default)]
pub struct NoAcceptance;

#[async_trait]
impl AcceptanceHook for NoAcceptance {
    async fn run(&self, _staged: &Artifact) -> AcceptanceOutcome {
        AcceptanceOutcome::pass("no acceptance tests configured")
    }
}

/// Hook that runs a configured script with artifact context in the
/// environment. Pass/fail is the script's exit status.
#[derive(Debug, Clone)]
pub struct CommandAcceptance {
    script: PathBuf,
}

impl CommandAcceptance {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl AcceptanceHook for CommandAcceptance {
    async fn run(&self, staged: &Artifact) -> AcceptanceOutcome {
        if !self.script.is_file() {
            return AcceptanceOutcome::fail(format!(
                "acceptance script not found: {}",
                self.script.display()
            ));
        }

        tracing::info!(script = %self.script.display(), artifact = %staged.id, "running acceptance tests");

        let output = Command::new(&self.script)
            .env("RELEVO_ARTIFACT_ID", staged.id.as_str())
            .env("RELEVO_ARTIFACT_PATH", staged.location.as_str())
            .env("RELEVO_ARTIFACT_CHECKSUM", &staged.checksum)
            .env("RELEVO_ARTIFACT_SIZE", staged.size_bytes.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                AcceptanceOutcome::pass(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                AcceptanceOutcome::fail(if stderr.is_empty() {
                    format!("acceptance script exited with {:?}", output.status.code())
                } else {
                    stderr
                })
            }
            Err(e) => AcceptanceOutcome::fail(format!("failed to execute acceptance script: {e}")),
        }
    }
}
