// ABOUTME: Entry point for the relevo CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use relevo::config::{self, Config};
use relevo::error::Result;
use relevo::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, output).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { slot, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, slot.as_deref(), force)
        }
        Commands::Deploy { artifact } => {
            let config = discover_config()?;
            commands::deploy(config, &artifact, output).await
        }
        Commands::Rollback => {
            let config = discover_config()?;
            commands::rollback(config, output).await
        }
        Commands::Status => {
            let config = discover_config()?;
            commands::status(config, output).await
        }
        Commands::History { limit } => {
            let config = discover_config()?;
            commands::history(config, limit, output).await
        }
    }
}

fn discover_config() -> Result<Config> {
    let cwd = env::current_dir()?;
    Config::discover(&cwd)
}
