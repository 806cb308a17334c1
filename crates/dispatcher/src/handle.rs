//! SinkSlot - failure boundary around one configured sink

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, instrument, warn};

use contracts::{Event, LogSink, SinkKind};
use observability::{DeliveryStatus, DIAGNOSTICS_TARGET};

use crate::metrics::SinkMetrics;

/// What happened to one event in one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Filtered,
    Failed,
}

/// A configured sink plus the boundary that keeps its failures local
///
/// Errors and panics raised by the sink are reported on the diagnostics
/// target and counted; they never reach the dispatcher's caller.
pub struct SinkSlot<S> {
    sink: S,
    metrics: Arc<SinkMetrics>,
}

impl<S: LogSink> SinkSlot<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get the wrapped sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn kind(&self) -> SinkKind {
        self.sink.kind()
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Deliver one event through the boundary
    #[instrument(
        name = "sink_slot_deliver",
        skip(self, event),
        fields(sink = %self.sink.name(), severity = %event.severity)
    )]
    pub async fn deliver(&self, event: &Event) -> DeliveryOutcome {
        let kind = self.sink.kind();

        if !self.sink.filter().accepts(event) {
            self.metrics.inc_filtered_count();
            observability::record_filtered(kind);
            debug!(sink = %self.sink.name(), "Event filtered");
            return DeliveryOutcome::Filtered;
        }

        match AssertUnwindSafe(self.sink.log(event)).catch_unwind().await {
            Ok(Ok(())) => {
                self.metrics.inc_delivered_count();
                observability::record_delivery(kind, DeliveryStatus::Success);
                DeliveryOutcome::Delivered
            }
            Ok(Err(e)) => {
                self.metrics.inc_failure_count();
                observability::record_delivery(kind, DeliveryStatus::Failure);
                warn!(
                    target: DIAGNOSTICS_TARGET,
                    sink = %self.sink.name(),
                    error = %e,
                    "Sink delivery failed"
                );
                DeliveryOutcome::Failed
            }
            Err(payload) => {
                self.metrics.inc_failure_count();
                observability::record_delivery(kind, DeliveryStatus::Panic);
                error!(
                    target: DIAGNOSTICS_TARGET,
                    sink = %self.sink.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Sink panicked while delivering"
                );
                DeliveryOutcome::Failed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
