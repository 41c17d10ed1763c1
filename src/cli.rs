// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relevo")]
#[command(about = "Model deployment with atomic promotion and automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output (CI mode)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON-lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new relevo.yml configuration file
    Init {
        /// Production slot name
        #[arg(short, long)]
        slot: Option<String>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate, stage, and promote a model artifact
    Deploy {
        /// Path to the candidate model file
        artifact: PathBuf,
    },

    /// Restore the most recent backup to production
    Rollback,

    /// Show the production slot, backups, and any in-flight deployment
    Status,

    /// Show past deployment attempts from the audit log
    History {
        /// Only show the most recent N attempts
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
