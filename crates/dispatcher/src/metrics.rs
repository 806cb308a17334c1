//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use observability::SinkTally;

/// Metrics for a single sink slot
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Total successful deliveries
    delivered_count: AtomicU64,
    /// Total delivery failures (errors and panics)
    failure_count: AtomicU64,
    /// Total events rejected by the sink filter
    filtered_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get delivered count
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Increment delivered count
    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get filtered count
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    /// Increment filtered count
    pub fn inc_filtered_count(&self) {
        self.filtered_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered_count: self.delivered_count(),
            failure_count: self.failure_count(),
            filtered_count: self.filtered_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub delivered_count: u64,
    pub failure_count: u64,
    pub filtered_count: u64,
}

impl From<MetricsSnapshot> for SinkTally {
    fn from(snapshot: MetricsSnapshot) -> Self {
        SinkTally {
            delivered: snapshot.delivered_count,
            failed: snapshot.failure_count,
            filtered: snapshot.filtered_count,
        }
    }
}
