//! CLI for the dbprobe harness.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbprobe_core::config::{self, Backend, HarnessConfig};
use dbprobe_core::logging;
use std::path::PathBuf;

use commands::{run_init_config, run_init_table, run_probe, run_show_config};

/// Top-level CLI for the dbprobe harness.
#[derive(Debug, Parser)]
#[command(name = "dbprobe")]
#[command(
    about = "dbprobe: write-then-read resilience probe for a pooled database",
    long_about = None
)]
pub struct Cli {
    /// Config file (default: ~/.config/dbprobe/config.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to ~/.local/state/dbprobe/dbprobe.log instead of stderr.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the probe rounds until done, fail-fast, or pool exhaustion.
    Run {
        /// Number of rounds (default from config: 200).
        #[arg(long, value_name = "N")]
        rounds: Option<u32>,
        /// Probe attempts per round (default from config: 10).
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
        /// Probe a SQLite database file instead of the configured server.
        #[arg(long, value_name = "PATH")]
        sqlite: Option<PathBuf>,
    },

    /// Create the probe table if it does not exist, then exit.
    InitTable {
        /// Use a SQLite database file instead of the configured server.
        #[arg(long, value_name = "PATH")]
        sqlite: Option<PathBuf>,
    },

    /// Print the effective configuration (password masked).
    ShowConfig,

    /// Write the default configuration file.
    InitConfig,
}

impl Cli {
    pub fn init_logging(&self) {
        if !self.log_file {
            logging::init_logging_stderr();
            return;
        }
        if let Err(e) = logging::init_logging_file() {
            logging::init_logging_stderr();
            tracing::warn!("file logging unavailable, using stderr: {:#}", e);
        }
    }

    /// Dispatch the subcommand. Returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        if let CliCommand::InitConfig = self.command {
            run_init_config(self.config.as_deref())?;
            return Ok(0);
        }

        let mut cfg = config::load(self.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg.redacted());

        match self.command {
            CliCommand::Run {
                rounds,
                attempts,
                sqlite,
            } => {
                if let Some(n) = rounds {
                    cfg.probe.rounds = n;
                }
                if let Some(n) = attempts {
                    cfg.probe.attempts = n;
                }
                use_sqlite(&mut cfg, sqlite);
                cfg.validate()?;
                run_probe(&cfg).await
            }
            CliCommand::InitTable { sqlite } => {
                use_sqlite(&mut cfg, sqlite);
                cfg.validate()?;
                run_init_table(&cfg).await?;
                Ok(0)
            }
            CliCommand::ShowConfig => {
                run_show_config(&cfg)?;
                Ok(0)
            }
            CliCommand::InitConfig => Ok(0),
        }
    }
}

fn use_sqlite(cfg: &mut HarnessConfig, sqlite: Option<PathBuf>) {
    if let Some(path) = sqlite {
        cfg.database.backend = Backend::Sqlite;
        cfg.database.sqlite_path = Some(path);
    }
}

#[cfg(test)]
mod tests;
