// ABOUTME: ProcessSupervisor implementation that shells out to configured commands.
// ABOUTME: Wraps systemctl, docker, or any service manager reachable from a shell.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ProcessSupervisor, SupervisorError};

/// Supervisor that runs configured shell commands for restart and probe.
///
/// The service name is exported as `RELEVO_SERVICE` so one command template
/// can serve several slots. Probe health is the command's exit status.
#[derive(Debug, Clone)]
pub struct CommandSupervisor {
    restart_cmd: String,
    probe_cmd: String,
}

impl CommandSupervisor {
    pub fn new(restart_cmd: impl Into<String>, probe_cmd: impl Into<String>) -> Self {
        Self {
            restart_cmd: restart_cmd.into(),
            probe_cmd: probe_cmd.into(),
        }
    }

    async fn run(&self, cmd: &str, service: &str) -> Result<std::process::Output, SupervisorError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env("RELEVO_SERVICE", service)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl ProcessSupervisor for CommandSupervisor {
    async fn restart(&self, service: &str) -> Result<(), SupervisorError> {
        tracing::info!(service, "restarting serving process");
        let output = self.run(&self.restart_cmd, service).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SupervisorError::RestartFailed {
                service: service.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    async fn probe(&self, service: &str) -> Result<bool, SupervisorError> {
        let output = self.run(&self.probe_cmd, service).await?;
        tracing::debug!(service, healthy = output.status.success(), "probe result");
        Ok(output.status.success())
    }
}
