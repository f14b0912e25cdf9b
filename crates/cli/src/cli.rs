//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::Policy;
use std::path::PathBuf;

/// CESA Dispatch - multi-channel crypto engine dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "cesa-dispatch",
    author,
    version,
    about = "Multi-channel crypto engine dispatcher",
    long_about = "Drives a simulated multi-channel crypto engine through the dispatcher.\n\n\
                  Spreads commands over engine channels by policy, pins split \n\
                  commands to one channel, and verifies that completions come \n\
                  back in exact submission order."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CESA_DISPATCH_VERBOSE")]
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
        env = "CESA_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated workload through the dispatcher
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "CESA_DISPATCH_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the number of engine channels
    #[arg(long, env = "CESA_DISPATCH_CHANNELS")]
    pub channels: Option<usize>,

    /// Override the per-channel queue depth
    #[arg(long, env = "CESA_DISPATCH_QUEUE_DEPTH")]
    pub queue_depth: Option<usize>,

    /// Override the number of commands to submit
    #[arg(long)]
    pub commands: Option<u64>,

    /// Override the dispatch policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Override the simulated engine seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CESA_DISPATCH_METRICS_PORT")]
    pub metrics_port: u16,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CESA_DISPATCH_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
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

/// Dispatch policy as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Disabled,
    SingleChannel,
    WeightedLeastLoaded,
    FlowAffinity,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Disabled => Policy::Disabled,
            PolicyArg::SingleChannel => Policy::SingleChannel,
            PolicyArg::WeightedLeastLoaded => Policy::WeightedLeastLoaded,
            PolicyArg::FlowAffinity => Policy::FlowAffinity,
        }
    }
}
