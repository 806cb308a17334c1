//! Event - the unit every sink receives
//!
//! One `Event` is built per log call and handed by reference to each sink.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ContractError;

/// Ordered mapping of extra structured fields attached to an event
pub type Attributes = Map<String, Value>;

/// Log severity, totally ordered from `Debug` to `Fatal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    #[serde(alias = "info")]
    Information,
    Success,
    #[serde(alias = "warn")]
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 6] = [
        Severity::Debug,
        Severity::Information,
        Severity::Success,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Lower-case name, also used as the per-level directory name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Information => "information",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// Upper-case name used in log headers
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Information => "INFORMATION",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "information" | "info" => Ok(Severity::Information),
            "success" => Ok(Severity::Success),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(ContractError::config_parse(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// A single log event
///
/// Immutable after construction. The timestamp is taken when the event is
/// built so every sink reports the same instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub severity: Severity,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            tag: None,
            attributes: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Add a single attribute, creating the mapping if needed
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attributes, if any non-empty mapping is attached
    pub fn non_empty_attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref().filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Information);
        assert!(Severity::Information < Severity::Success);
        assert!(Severity::Success < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        let mut sorted = Severity::ALL;
        sorted.sort();
        assert_eq!(sorted, Severity::ALL);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Information);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("fatal".parse::<Severity>().unwrap(), Severity::Fatal);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_serde_alias() {
        let s: Severity = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(s, Severity::Warning);
        assert_eq!(serde_json::to_string(&Severity::Information).unwrap(), "\"information\"");
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let event = Event::new(Severity::Debug, "m")
            .with_attribute("zeta", 1)
            .with_attribute("alpha", "two");
        let keys: Vec<_> = event.attributes.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_empty_attributes_are_hidden() {
        let event = Event::new(Severity::Debug, "m").with_attributes(Map::new());
        assert!(event.non_empty_attributes().is_none());
    }

    #[test]
    fn test_event_from_json_line() {
        let event: Event =
            serde_json::from_str(r#"{"severity":"error","message":"boom","tag":"db"}"#).unwrap();
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.tag.as_deref(), Some("db"));
        assert!(event.attributes.is_none());
    }
}
