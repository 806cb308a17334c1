//! Dispatcher - fan-out of one event to the configured sinks

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use contracts::{Event, LogSink, LoggerBlueprint, SinkKind};
use observability::DIAGNOSTICS_TARGET;
use remote_client::RemoteConnection;

use crate::error::DispatcherError;
use crate::handle::{DeliveryOutcome, SinkSlot};
use crate::metrics::MetricsSnapshot;
use crate::sinks::{ConsoleSink, FileSink, RemoteSink};

/// Which slots a dispatch goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkTarget {
    All,
    Only(SinkKind),
}

impl SinkTarget {
    pub fn includes(&self, kind: SinkKind) -> bool {
        match self {
            SinkTarget::All => true,
            SinkTarget::Only(only) => *only == kind,
        }
    }
}

/// Per-sink outcomes of one dispatch, in slot order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<(SinkKind, DeliveryOutcome)>,
}

impl DispatchReport {
    pub fn outcome(&self, kind: SinkKind) -> Option<DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| *outcome)
    }

    /// Sinks that actually received the event
    pub fn delivered(&self) -> Vec<SinkKind> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DeliveryOutcome::Delivered)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    blueprint: LoggerBlueprint,
    console_writer: Option<Box<dyn Write + Send>>,
    remote_connection: Option<Arc<dyn RemoteConnection>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(blueprint: LoggerBlueprint) -> Self {
        Self {
            blueprint,
            console_writer: None,
            remote_connection: None,
        }
    }

    /// Send console output to `writer` instead of stdout
    pub fn console_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console_writer = Some(writer);
        self
    }

    /// Connection handed to the remote sink once it is built
    pub fn remote_connection(mut self, connection: Arc<dyn RemoteConnection>) -> Self {
        self.remote_connection = Some(connection);
        self
    }

    /// Build the dispatcher
    ///
    /// Disabled sinks are not constructed. Fails on configuration that a
    /// sink cannot work with.
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let console = self
            .blueprint
            .console
            .as_ref()
            .filter(|c| c.enabled)
            .map(|config| match self.console_writer {
                Some(writer) => ConsoleSink::with_writer(config, writer),
                None => ConsoleSink::new(config),
            })
            .map(SinkSlot::new);

        let file = match self.blueprint.file.as_ref().filter(|c| c.enabled) {
            Some(config) => Some(SinkSlot::new(FileSink::new(config).map_err(|e| {
                DispatcherError::sink_creation(SinkKind::File.as_str(), e.to_string())
            })?)),
            None => None,
        };

        let remote = match self.blueprint.remote.as_ref().filter(|c| c.enabled) {
            Some(config) => Some(SinkSlot::new(RemoteSink::new(config).map_err(|e| {
                DispatcherError::sink_creation(SinkKind::Remote.as_str(), e.to_string())
            })?)),
            None => None,
        };

        let dispatcher = Dispatcher {
            console,
            file,
            remote,
        };

        if let Some(connection) = self.remote_connection {
            dispatcher.set_remote_connection(connection).await;
        }

        info!(sinks = ?dispatcher.sink_kinds(), "Dispatcher ready");
        Ok(dispatcher)
    }
}

/// The Dispatcher that fans events out to up to three sinks
///
/// Dispatching never fails: every delivery runs inside its slot's
/// failure boundary and all deliveries of one event run concurrently on
/// the caller's task.
pub struct Dispatcher {
    console: Option<SinkSlot<ConsoleSink>>,
    file: Option<SinkSlot<FileSink>>,
    remote: Option<SinkSlot<RemoteSink>>,
}

impl Dispatcher {
    /// Send to every configured sink
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        self.dispatch_to(SinkTarget::All, event).await
    }

    /// Send to one sink only
    ///
    /// A sink that is not configured is skipped with a diagnostic.
    pub async fn dispatch_only(&self, kind: SinkKind, event: &Event) -> DispatchReport {
        if !self.has_sink(kind) {
            warn!(
                target: DIAGNOSTICS_TARGET,
                sink = %kind,
                "Sink not configured, event not dispatched"
            );
            return DispatchReport::default();
        }
        self.dispatch_to(SinkTarget::Only(kind), event).await
    }

    /// Send to the slots selected by `target`
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, event),
        fields(severity = %event.severity, tag = ?event.tag)
    )]
    pub async fn dispatch_to(&self, target: SinkTarget, event: &Event) -> DispatchReport {
        let (console, file, remote) = tokio::join!(
            deliver_if(self.console.as_ref(), target, event),
            deliver_if(self.file.as_ref(), target, event),
            deliver_if(self.remote.as_ref(), target, event),
        );

        let report = DispatchReport {
            outcomes: [console, file, remote].into_iter().flatten().collect(),
        };
        debug!(outcomes = ?report.outcomes, "Event dispatched");
        report
    }

    /// Forward a connection handle to the remote sink
    pub async fn set_remote_connection(&self, connection: Arc<dyn RemoteConnection>) {
        match &self.remote {
            Some(slot) => slot.sink().set_connection(connection).await,
            None => debug!("No remote sink configured, connection ignored"),
        }
    }

    /// Get the remote sink, if configured
    pub fn remote(&self) -> Option<&RemoteSink> {
        self.remote.as_ref().map(SinkSlot::sink)
    }

    pub fn has_sink(&self, kind: SinkKind) -> bool {
        match kind {
            SinkKind::Console => self.console.is_some(),
            SinkKind::File => self.file.is_some(),
            SinkKind::Remote => self.remote.is_some(),
        }
    }

    /// Configured sinks, in slot order
    pub fn sink_kinds(&self) -> Vec<SinkKind> {
        SinkKind::ALL
            .into_iter()
            .filter(|kind| self.has_sink(*kind))
            .collect()
    }

    /// Get metrics for all configured sinks
    pub fn metrics(&self) -> Vec<(SinkKind, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(3);
        if let Some(slot) = &self.console {
            metrics.push((slot.kind(), slot.metrics().snapshot()));
        }
        if let Some(slot) = &self.file {
            metrics.push((slot.kind(), slot.metrics().snapshot()));
        }
        if let Some(slot) = &self.remote {
            metrics.push((slot.kind(), slot.metrics().snapshot()));
        }
        metrics
    }
}

async fn deliver_if<S: LogSink>(
    slot: Option<&SinkSlot<S>>,
    target: SinkTarget,
    event: &Event,
) -> Option<(SinkKind, DeliveryOutcome)> {
    let slot = slot.filter(|slot| target.includes(slot.kind()))?;
    Some((slot.kind(), slot.deliver(event).await))
}

/// Convenience function to build a dispatcher from a blueprint
#[instrument(name = "dispatcher_create", skip(blueprint))]
pub async fn create_dispatcher(blueprint: LoggerBlueprint) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(blueprint).build().await
}
