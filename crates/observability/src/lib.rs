//! # Observability
//!
//! Tracing and Prometheus metrics for the logging dispatcher.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact formats)
//! - Prometheus metrics export
//! - Delivery counters and an in-memory summary aggregator
//!
//! ## Usage
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(ObservabilityConfig::for_verbosity(1, false, LogFormat::Json))?;
//!
//! observability::record_delivery(SinkKind::File, DeliveryStatus::Success);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub use crate::metrics::{
    record_delivery, record_filtered, record_queue_depth, record_queue_drop,
    record_retention_deleted, record_rotation, DeliveryAggregator, DeliveryStatus, SinkTally,
};

/// Tracing target for sink failures and dropped events
///
/// Kept apart from the events being dispatched so a console sink never
/// echoes its own diagnostics.
pub const DIAGNOSTICS_TARGET: &str = "multilog::diagnostics";

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Level used when RUST_LOG is unset
    pub default_log_level: String,
    /// Use `default_log_level` even if RUST_LOG is set
    pub ignore_env: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: "info".to_string(),
            ignore_env: false,
        }
    }
}

impl ObservabilityConfig {
    /// Map `-v` counts and `--quiet` to a level
    ///
    /// Quiet pins the level to `warn` regardless of RUST_LOG.
    pub fn for_verbosity(verbose: u8, quiet: bool, log_format: LogFormat) -> Self {
        let default_log_level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            default_log_level: default_log_level.to_string(),
            ignore_env: quiet,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if self.ignore_env {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable
    Pretty,
    /// Compact single line
    #[default]
    Compact,
}

/// Install the tracing subscriber, and the Prometheus exporter if a port is set
///
/// Everything is written to stderr; stdout belongs to the console sink.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Initialize Prometheus metrics only (no tracing)
///
/// For when tracing is already set up elsewhere.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
