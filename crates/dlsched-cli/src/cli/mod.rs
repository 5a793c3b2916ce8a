//! CLI for the dlsched download scheduler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dlsched_core::config;
use std::path::PathBuf;

use commands::{run_check, run_completions, run_manifest, RunOptions};

/// Top-level CLI for the dlsched download scheduler.
#[derive(Debug, Parser)]
#[command(name = "dlsched")]
#[command(about = "dlsched: admission-control scheduler for multi-task downloads", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/dlsched/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run every task of a manifest through the scheduler (simulated transfers).
    Run {
        /// TOML manifest listing the tasks.
        manifest: PathBuf,
        /// Maximum number of concurrent downloads (overrides config).
        #[arg(long, short = 'j', value_name = "N")]
        max_concurrent: Option<usize>,
        /// Engine tick period in milliseconds (overrides config).
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,
    },

    /// Validate a manifest and list its tasks.
    Check {
        /// TOML manifest listing the tasks.
        manifest: PathBuf,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                manifest,
                max_concurrent,
                tick_ms,
            } => {
                let cfg = match &cli.config {
                    Some(path) => config::load_or_init_at(path)?,
                    None => config::load_or_init()?,
                };
                tracing::debug!("loaded config: {:?}", cfg);
                let opts = RunOptions {
                    max_concurrent,
                    tick_ms,
                };
                run_manifest(&cfg, &manifest, &opts).await?;
            }
            CliCommand::Check { manifest } => run_check(&manifest)?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
