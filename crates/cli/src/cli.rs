//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use contracts::{Severity, SinkKind};

/// multilog - send log events to console, rotating files and a chat channel
#[derive(Parser, Debug)]
#[command(
    name = "multilog",
    author,
    version,
    about = "Multi-sink logging dispatcher",
    long_about = "Dispatches log events to the console, to rotating daily log files and to a \n\
                  remote chat channel, as described by a TOML or JSON configuration file."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MULTILOG_VERBOSE")]
    pub verbose: u8,

    /// Suppress all diagnostics except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Diagnostic output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "MULTILOG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a single event
    Emit(EmitArgs),

    /// Dispatch newline-delimited JSON events read from stdin
    Pipe(PipeArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Options shared by the dispatching commands
#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "multilog.toml", env = "MULTILOG_CONFIG")]
    pub config: PathBuf,

    /// Send to this sink only
    #[arg(long, value_parser = parse_sink_kind)]
    pub only: Option<SinkKind>,

    /// Bot token for the remote chat API
    #[arg(long, env = "MULTILOG_REMOTE_TOKEN", hide_env_values = true)]
    pub remote_token: Option<String>,

    /// Override the remote API root
    #[arg(long, env = "MULTILOG_REMOTE_API_BASE")]
    pub remote_api_base: Option<String>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MULTILOG_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `emit` command
#[derive(Args, Debug, Clone)]
pub struct EmitArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Event severity
    #[arg(short, long, value_parser = parse_severity, default_value = "information")]
    pub level: Severity,

    /// Event message
    #[arg(short, long)]
    pub message: String,

    /// Event tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Attribute as key=value (value parsed as JSON when possible); repeatable
    #[arg(short, long = "attr", value_name = "KEY=VALUE")]
    pub attrs: Vec<String>,
}

/// Arguments for the `pipe` command
#[derive(Args, Debug, Clone)]
pub struct PipeArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Print a delivery summary on stderr when input ends
    #[arg(long)]
    pub summary: bool,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "multilog.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "multilog.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
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

fn parse_severity(value: &str) -> Result<Severity, String> {
    value.parse().map_err(|e: contracts::ContractError| e.to_string())
}

fn parse_sink_kind(value: &str) -> Result<SinkKind, String> {
    value.parse().map_err(|e: contracts::ContractError| e.to_string())
}
