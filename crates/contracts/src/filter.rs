//! Per-sink level and tag filtering

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Event, Severity};

/// Threshold and tag allow-list applied by every sink before it does any work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkFilter {
    /// Minimum severity (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<Severity>,

    /// If set, only events whose tag is in this set pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_tags: Option<BTreeSet<String>>,
}

impl SinkFilter {
    /// Filter that accepts everything
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn with_min_level(mut self, level: Severity) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn with_allow_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `event` is visible to the sink owning this filter
    ///
    /// An allow-list is strict: an untagged event is rejected, not let
    /// through. Sinks that should see untagged events must omit `allow_tags`.
    pub fn accepts(&self, event: &Event) -> bool {
        if let Some(min) = self.min_level {
            if event.severity < min {
                return false;
            }
        }
        match (&self.allow_tags, &event.tag) {
            (None, _) => true,
            (Some(allowed), Some(tag)) => allowed.contains(tag),
            (Some(_), None) => false,
        }
    }
}
