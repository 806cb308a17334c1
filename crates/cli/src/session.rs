//! Dispatch session shared by the `emit` and `pipe` commands.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use contracts::{Event, SinkKind};
use dispatcher::{DispatchReport, Dispatcher, DispatcherBuilder};
use observability::DeliveryAggregator;

use crate::cli::DispatchArgs;
use crate::error::CliError;

/// A built dispatcher plus the totals of one run
pub struct Session {
    dispatcher: Dispatcher,
    only: Option<SinkKind>,
    aggregator: DeliveryAggregator,
}

impl Session {
    /// Load the configuration, build the dispatcher and connect the remote sink
    pub async fn open(args: &DispatchArgs) -> Result<Self> {
        if !args.config.exists() {
            return Err(CliError::config_not_found(args.config.display().to_string()).into());
        }

        let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
            .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
        info!(
            config = %args.config.display(),
            sinks = ?blueprint.enabled_sinks(),
            "Configuration loaded"
        );

        if args.metrics_port != 0 {
            observability::init_metrics_only(args.metrics_port)?;
        }

        let dispatcher = DispatcherBuilder::new(blueprint)
            .build()
            .await
            .context("Failed to build dispatcher")?;

        if dispatcher.has_sink(SinkKind::Remote) {
            connect_remote(&dispatcher, args).await;
        }

        Ok(Self {
            dispatcher,
            only: args.only,
            aggregator: DeliveryAggregator::new(),
        })
    }

    pub async fn dispatch(&mut self, event: &Event) -> DispatchReport {
        self.aggregator.record_event();
        let report = match self.only {
            Some(kind) => self.dispatcher.dispatch_only(kind, event).await,
            None => self.dispatcher.dispatch(event).await,
        };
        debug!(outcomes = ?report.outcomes, "Dispatch finished");
        report
    }

    /// Collect per-sink totals and report what is still queued
    pub fn finish(mut self) -> DeliveryAggregator {
        for (kind, snapshot) in self.dispatcher.metrics() {
            self.aggregator.set_sink(kind, snapshot.into());
        }

        if let Some(remote) = self.dispatcher.remote() {
            self.aggregator.remote_pending = remote.pending_len();
            self.aggregator.remote_dropped = remote.dropped_count();
            if self.aggregator.remote_pending > 0 {
                warn!(
                    pending = self.aggregator.remote_pending,
                    state = ?remote.state(),
                    "Remote events still queued, no ready connection"
                );
            }
        }

        self.aggregator
    }
}

#[cfg(feature = "rest")]
async fn connect_remote(dispatcher: &Dispatcher, args: &DispatchArgs) {
    use std::sync::Arc;

    let Some(token) = args.remote_token.as_deref() else {
        warn!("MULTILOG_REMOTE_TOKEN not set, remote events will stay queued");
        return;
    };

    match open_rest_connection(token, args.remote_api_base.as_deref()).await {
        Ok(connection) => dispatcher.set_remote_connection(Arc::new(connection)).await,
        Err(e) => warn!(error = %e, "Remote events will stay queued"),
    }
}

#[cfg(feature = "rest")]
async fn open_rest_connection(
    token: &str,
    api_base: Option<&str>,
) -> Result<remote_client::RestConnection, CliError> {
    let mut config = remote_client::RestConfig::new(token);
    if let Some(api_base) = api_base {
        config.api_base = api_base.to_string();
    }

    let connection = remote_client::RestConnection::new(config)
        .map_err(|e| CliError::remote_connection(e.to_string()))?;
    connection
        .connect()
        .await
        .map_err(|e| CliError::remote_connection(e.to_string()))?;
    Ok(connection)
}

#[cfg(not(feature = "rest"))]
async fn connect_remote(_dispatcher: &Dispatcher, _args: &DispatchArgs) {
    warn!("Built without REST support, remote events will stay queued");
}
