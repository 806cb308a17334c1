//! LogSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for sinks and the names they are addressed by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ContractError, Event, SinkFilter};

/// Identifies one of the sink slots a dispatcher can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Console,
    File,
    Remote,
}

impl SinkKind {
    pub const ALL: [SinkKind; 3] = [SinkKind::Console, SinkKind::File, SinkKind::Remote];

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Remote => "remote",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(SinkKind::Console),
            "file" => Ok(SinkKind::File),
            "remote" | "discord" => Ok(SinkKind::Remote),
            other => Err(ContractError::config_parse(format!("unknown sink '{other}'"))),
        }
    }
}

/// Log output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(LogSink: Send)]
pub trait LocalLogSink {
    /// Sink name (used for diagnostics/metrics)
    fn name(&self) -> &str;

    /// Slot this sink occupies in a dispatcher
    fn kind(&self) -> SinkKind;

    /// Level/tag filter applied before any work
    fn filter(&self) -> &SinkFilter;

    /// Deliver one event
    ///
    /// Rejected events are a silent no-op.
    ///
    /// # Errors
    /// Returns the delivery error (should include context)
    async fn log(&self, event: &Event) -> Result<(), ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_round_trip_names() {
        for kind in SinkKind::ALL {
            assert_eq!(kind.as_str().parse::<SinkKind>().unwrap(), kind);
        }
        assert_eq!("discord".parse::<SinkKind>().unwrap(), SinkKind::Remote);
        assert!("syslog".parse::<SinkKind>().is_err());
    }
}
