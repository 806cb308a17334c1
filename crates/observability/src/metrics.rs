//! Delivery metrics
//!
//! Thin recorders over the `metrics` facade, plus an in-memory aggregator
//! for end-of-run summaries.

use std::collections::BTreeMap;
use std::fmt;

use contracts::SinkKind;
use metrics::{counter, gauge};

/// Outcome of one delivery attempt through a sink slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    Failure,
    Panic,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failure => "failure",
            DeliveryStatus::Panic => "panic",
        }
    }
}

/// Record a delivery attempt
pub fn record_delivery(sink: SinkKind, status: DeliveryStatus) {
    counter!(
        "multilog_events_delivered_total",
        "sink" => sink.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// Record an event rejected by a sink filter
pub fn record_filtered(sink: SinkKind) {
    counter!("multilog_events_filtered_total", "sink" => sink.as_str()).increment(1);
}

/// Record the current remote queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("multilog_remote_queue_depth").set(depth as f64);
}

/// Record an event dropped because the remote queue was full
pub fn record_queue_drop() {
    counter!("multilog_remote_queue_dropped_total").increment(1);
}

/// Record a file rotation
pub fn record_rotation() {
    counter!("multilog_file_rotations_total").increment(1);
}

/// Record files removed by a retention sweep
pub fn record_retention_deleted(count: usize) {
    if count > 0 {
        counter!("multilog_file_retention_deleted_total").increment(count as u64);
    }
}

/// Per-sink delivery counters kept in memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkTally {
    pub delivered: u64,
    pub failed: u64,
    pub filtered: u64,
}

/// Delivery aggregator
///
/// Collects per-sink totals so a run can print a summary.
#[derive(Debug, Clone, Default)]
pub struct DeliveryAggregator {
    /// Events handed to the dispatcher
    pub total_events: u64,

    /// Totals per sink
    pub per_sink: BTreeMap<SinkKind, SinkTally>,

    /// Events left in the remote queue at the end of the run
    pub remote_pending: usize,

    /// Events the remote queue refused
    pub remote_dropped: u64,
}

impl DeliveryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatched event
    pub fn record_event(&mut self) {
        self.total_events += 1;
    }

    /// Overwrite the totals for one sink
    pub fn set_sink(&mut self, sink: SinkKind, tally: SinkTally) {
        self.per_sink.insert(sink, tally);
    }

    /// Sum of failures across sinks
    pub fn total_failures(&self) -> u64 {
        self.per_sink.values().map(|t| t.failed).sum()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for DeliveryAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Events dispatched: {}", self.total_events)?;
        for (sink, tally) in &self.per_sink {
            writeln!(
                f,
                "  {:<8} delivered={} failed={} filtered={}",
                sink.as_str(),
                tally.delivered,
                tally.failed,
                tally.filtered
            )?;
        }
        if self.remote_pending > 0 || self.remote_dropped > 0 {
            writeln!(
                f,
                "Remote queue: {} pending, {} dropped",
                self.remote_pending, self.remote_dropped
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_totals() {
        let mut aggregator = DeliveryAggregator::new();
        aggregator.record_event();
        aggregator.record_event();
        aggregator.set_sink(
            SinkKind::Console,
            SinkTally {
                delivered: 2,
                failed: 0,
                filtered: 0,
            },
        );
        aggregator.set_sink(
            SinkKind::File,
            SinkTally {
                delivered: 1,
                failed: 1,
                filtered: 0,
            },
        );

        assert_eq!(aggregator.total_events, 2);
        assert_eq!(aggregator.total_failures(), 1);

        aggregator.reset();
        assert_eq!(aggregator.total_events, 0);
        assert!(aggregator.per_sink.is_empty());
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryAggregator::new();
        aggregator.total_events = 3;
        aggregator.set_sink(
            SinkKind::Remote,
            SinkTally {
                delivered: 0,
                failed: 0,
                filtered: 1,
            },
        );
        aggregator.remote_pending = 2;

        let output = aggregator.to_string();
        assert!(output.contains("Events dispatched: 3"));
        assert!(output.contains("remote"));
        assert!(output.contains("2 pending, 0 dropped"));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // The facade is a no-op until a recorder is installed
        record_delivery(SinkKind::File, DeliveryStatus::Failure);
        record_filtered(SinkKind::Console);
        record_queue_depth(3);
        record_queue_drop();
        record_rotation();
        record_retention_deleted(0);
        assert_eq!(DeliveryStatus::Panic.as_str(), "panic");
    }
}
