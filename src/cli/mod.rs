//! Command-line interface definitions.

mod check;
mod run;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

/// Copy-trading engine for a prediction-market CLOB.
#[derive(Parser, Debug)]
#[command(name = "whalecopy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the strategy file.
    #[arg(short, long, default_value = "strategies.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot in the foreground.
    Run(RunArgs),

    /// Show the current state of persisted positions and spend.
    Status,

    /// Validate the strategy file without starting anything.
    Check,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Use JSON log format instead of pretty.
    #[arg(long)]
    pub json_logs: bool,

    /// Trade against the mock exchange instead of the live CLOB.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run::execute(&self.config, &args).await,
            Commands::Status => status::execute(&self.config),
            Commands::Check => check::execute(&self.config),
        }
    }
}
