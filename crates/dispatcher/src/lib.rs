//! # Dispatcher
//!
//! Event fan-out module.
//!
//! Responsibilities:
//! - Build the console, file and remote sinks from a `LoggerBlueprint`
//! - Fan each `Event` out to the configured sinks concurrently
//! - Keep one sink's failure or unavailability away from the others

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{Event, LogSink, LoggerBlueprint, SinkKind};
pub use dispatcher::{
    create_dispatcher, DispatchReport, Dispatcher, DispatcherBuilder, SinkTarget,
};
pub use error::DispatcherError;
pub use handle::{DeliveryOutcome, SinkSlot};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{ConsoleSink, FileSink, RemoteSink, RemoteState};
