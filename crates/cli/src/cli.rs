//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// EmotiBit Bridge - forwards marker streams to EmotiBit packets and publishes device channels
#[derive(Parser, Debug)]
#[command(
    name = "emotibit-bridge",
    author,
    version,
    about = "EmotiBit marker/stream bridge",
    long_about = "Bridges external marker streams and an EmotiBit device.\n\n\
                  Subscribes to the configured marker streams, re-encodes every \n\
                  marker as EmotiBit packets with clock correlation, and publishes \n\
                  device channels described by patchboard documents."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EMOTIBIT_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "EMOTIBIT_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate a configuration file and the documents it references
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Run a shell command and look for an expected response
    Exec(ExecArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bridge.toml",
        env = "EMOTIBIT_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the packet sink address from configuration
    #[arg(long, env = "EMOTIBIT_BRIDGE_PACKET_SINK")]
    pub packet_sink: Option<String>,

    /// Override the tick interval from configuration (milliseconds)
    #[arg(long, env = "EMOTIBIT_BRIDGE_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Maximum number of ticks to run (0 = unlimited)
    #[arg(long, default_value = "0", env = "EMOTIBIT_BRIDGE_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "EMOTIBIT_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Publish mock markers at this rate (Hz) on every subscribed stream (memory transport only)
    #[arg(long, env = "EMOTIBIT_BRIDGE_MOCK_MARKERS")]
    pub mock_markers: Option<f64>,

    /// Skip preflight commands
    #[arg(long)]
    pub skip_preflight: bool,

    /// Validate configuration and exit without running the bridge
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "EMOTIBIT_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show channels and patches of every patchboard
    #[arg(long)]
    pub channels: bool,

    /// Show an example of the marker packets the bridge emits
    #[arg(long)]
    pub packets: bool,
}

/// Arguments for the `exec` command
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Shell command line
    pub command: String,

    /// Substring expected in the command's stdout
    #[arg(short, long)]
    pub expect: String,

    /// Stop reading and kill the process once the response appears
    #[arg(long)]
    pub stop_on_match: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
