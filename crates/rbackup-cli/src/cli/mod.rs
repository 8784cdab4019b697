//! CLI for rbackup.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rbackup_core::config;
use rbackup_core::lock;
use std::path::PathBuf;

use commands::{run_backup, run_check, run_completions, run_prune};

/// Top-level CLI for the rbackup orchestrator.
#[derive(Debug, Parser)]
#[command(name = "rbackup")]
#[command(about = "rbackup: scheduled rsync backups with host-fair concurrency and retention", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/rbackup/config.toml if present, else /etc/backup-rsync.toml).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append logs here instead of ~/.local/state/rbackup/rbackup.log.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run all backups, then delete expired snapshots.
    Run {
        /// Print the rsync commands instead of running them; nothing is created or deleted.
        #[arg(long)]
        dry_run: bool,
        /// Singleton lock file (default: <tmp>/backup-rsync.lock).
        #[arg(long, value_name = "PATH")]
        lock_file: Option<PathBuf>,
    },

    /// Validate the configuration and show the resolved, ordered backup plan.
    Check,

    /// Only delete snapshots older than their retention window.
    Prune {
        /// List expired snapshots without deleting them.
        #[arg(long)]
        dry_run: bool,
        /// Singleton lock file (default: <tmp>/backup-rsync.lock).
        #[arg(long, value_name = "PATH")]
        lock_file: Option<PathBuf>,
    },

    /// Print a shell completion script to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

impl Cli {
    /// Dispatch the parsed command. Returns the process exit code for
    /// non-error outcomes (0, or the signal code if interrupted).
    pub async fn run(self) -> Result<i32> {
        let config_path = self.config.unwrap_or_else(config::default_config_path);
        let lock_path = |p: Option<PathBuf>| p.unwrap_or_else(lock::default_lock_path);

        match self.command {
            CliCommand::Run { dry_run, lock_file } => {
                run_backup(&config_path, &lock_path(lock_file), dry_run).await
            }
            CliCommand::Check => run_check(&config_path).map(|()| 0),
            CliCommand::Prune { dry_run, lock_file } => {
                run_prune(&config_path, &lock_path(lock_file), dry_run).await
            }
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
