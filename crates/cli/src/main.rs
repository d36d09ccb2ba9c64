//! Workload usage aggregation CLI
//!
//! Runs the classify, filter and aggregate pipeline over a usage report
//! on disk, without the processor service.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{aggregate, classify, columns};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Workload usage aggregation CLI
#[derive(Parser)]
#[command(name = "rosagg")]
#[command(
    author,
    version,
    about = "Aggregate container usage reports by workload",
    long_about = None
)]
pub struct Cli {
    /// Output format (can also be set via ROSAGG_FORMAT env var)
    #[arg(long, short, global = true, env = "ROSAGG_FORMAT", default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate a usage report into per-workload rows
    Aggregate {
        /// Usage report CSV
        file: PathBuf,

        /// Write CSV output to this path instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show the workload object each row resolves to
    Classify {
        /// Usage report CSV
        file: PathBuf,

        /// Show at most this many rows
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// List metric columns and how each one is reduced
    Columns,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aggregator_lib=debug"))
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Aggregate { file, output } => {
            aggregate::run(&file, output.as_deref(), cli.format)?;
        }
        Commands::Classify { file, limit } => {
            classify::run(&file, limit, cli.format)?;
        }
        Commands::Columns => {
            columns::run(cli.format)?;
        }
    }

    Ok(())
}
