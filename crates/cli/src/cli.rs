//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Batcher - adaptive batching engine driver
#[derive(Parser, Debug)]
#[command(
    name = "batcher",
    author,
    version,
    about = "Adaptive batching engine simulator",
    long_about = "Drives the adaptive batcher against a simulated sink.\n\n\
                  Producers offer payloads concurrently; the batcher decides per \n\
                  offer whether to send directly or buffer, and flushes batches at \n\
                  a cadence derived from the probed sink latency."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCHER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCHER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run producers against a simulated sink
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "BATCHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override number of concurrent producers
    #[arg(long)]
    pub producers: Option<usize>,

    /// Override items offered by each producer
    #[arg(long)]
    pub items: Option<usize>,

    /// Override the simulated sink's probe answer (ms)
    #[arg(long)]
    pub probe_ms: Option<f64>,

    /// Use the corrected projected-average formula
    #[arg(long)]
    pub corrected_formula: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCHER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "batcher.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
