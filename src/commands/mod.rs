// ABOUTME: CLI command handlers and shared pipeline assembly.
// ABOUTME: Wires config into the FsStore/CommandSupervisor orchestrator.

mod deploy;
mod rollback;
mod status;

pub use deploy::deploy;
pub use rollback::rollback;
pub use status::{history, status};

use std::sync::Arc;

use relevo::config::Config;
use relevo::deploy::{
    AcceptanceHook, AnyFormat, CommandAcceptance, DeploymentOrchestrator, FormatCheck,
    MagicFormatCheck, NoAcceptance, PipelineSettings, SlotLocks,
};
use relevo::error::{Error, Result};
use relevo::store::FsStore;
use relevo::supervisor::CommandSupervisor;

pub(crate) type CliOrchestrator = DeploymentOrchestrator<FsStore, CommandSupervisor>;

/// Assemble the pipeline the CLI drives: filesystem store, command-based
/// supervisor, and (if configured) a script acceptance hook.
pub(crate) fn build_orchestrator(config: &Config) -> Result<CliOrchestrator> {
    let store = Arc::new(FsStore::new(&config.store));
    let supervisor = Arc::new(CommandSupervisor::new(
        &config.service.restart_cmd,
        &config.service.probe_cmd,
    ));

    let format: Arc<dyn FormatCheck> = if config.validation.formats.is_empty() {
        Arc::new(AnyFormat)
    } else {
        Arc::new(
            MagicFormatCheck::for_formats(&config.validation.formats)
                .map_err(Error::InvalidConfig)?,
        )
    };

    let acceptance: Arc<dyn AcceptanceHook> = match &config.acceptance {
        Some(acceptance) => Arc::new(CommandAcceptance::new(&acceptance.script)),
        None => Arc::new(NoAcceptance),
    };

    Ok(DeploymentOrchestrator::new(
        config.slot.clone(),
        store,
        supervisor,
        acceptance,
        PipelineSettings {
            min_artifact_bytes: config.validation.min_size_bytes,
            format,
            service: config.service.name.clone(),
            poll_interval: config.service.poll_interval,
        },
        Arc::new(SlotLocks::new()),
    ))
}
