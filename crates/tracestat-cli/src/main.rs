//! CLI tool for the tracestat toolchain.
//!
//! Provides commands for parsing emulator traces, computing performance
//! metrics, and rendering reports.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tracestat")]
#[command(about = "Static performance analysis of emulator instruction traces", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a QEMU trace log into an execution model
    Parse {
        /// Input .log file
        input: PathBuf,

        /// Output .json file
        #[arg(long, short, default_value = "data.json")]
        output: PathBuf,

        /// Skip malformed lines instead of aborting
        #[arg(long)]
        skip_malformed: bool,
    },

    /// Compute metrics from an execution model
    Compute {
        /// Execution model produced by `parse`
        input: PathBuf,

        /// Output .json file
        #[arg(long, short, default_value = "computed.json")]
        output: PathBuf,

        /// Instruction cost model
        #[arg(long, default_value = "config/instructions.toml")]
        costs: PathBuf,

        /// Attribute running block subtotals to per-instruction cycle buckets
        #[arg(long)]
        legacy_cycle_buckets: bool,
    },

    /// Render a markdown report from computed metrics
    Report {
        /// Metrics produced by `compute`
        input: PathBuf,

        /// Output directory
        #[arg(long, short, default_value = "report")]
        output: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse {
            input,
            output,
            skip_malformed,
        } => commands::parse(&input, &output, skip_malformed),
        Commands::Compute {
            input,
            output,
            costs,
            legacy_cycle_buckets,
        } => commands::compute(&input, &output, &costs, legacy_cycle_buckets),
        Commands::Report { input, output } => commands::report(&input, &output),
    }
}
