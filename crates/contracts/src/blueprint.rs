//! LoggerBlueprint - Config Loader output
//!
//! Describes which sinks a logger has and how each one filters and delivers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{SinkFilter, SinkKind};

/// Default size threshold before a log file is rotated (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: u32 = 14;

/// Default capacity of the remote pre-ready queue
pub const DEFAULT_PENDING_CAPACITY: usize = 100;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete logger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Console output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<ConsoleConfig>,

    /// Rotating file output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileConfig>,

    /// Remote chat channel output
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "discord")]
    pub remote: Option<RemoteConfig>,
}

impl LoggerBlueprint {
    /// Sinks that are present and enabled, in dispatch-table order
    pub fn enabled_sinks(&self) -> Vec<SinkKind> {
        let mut kinds = Vec::with_capacity(3);
        if self.console.as_ref().is_some_and(|c| c.enabled) {
            kinds.push(SinkKind::Console);
        }
        if self.file.as_ref().is_some_and(|c| c.enabled) {
            kinds.push(SinkKind::File);
        }
        if self.remote.as_ref().is_some_and(|c| c.enabled) {
            kinds.push(SinkKind::Remote);
        }
        kinds
    }
}

fn default_true() -> bool {
    true
}

/// Console sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub filter: SinkFilter,

    /// Print the attributes block
    #[serde(default = "default_true")]
    pub show_attributes: bool,

    /// Emit ANSI colors
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: SinkFilter::default(),
            show_attributes: true,
            colored: true,
        }
    }
}

/// File sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub filter: SinkFilter,

    /// Root folder of the log tree (required when enabled)
    #[serde(default)]
    pub folder_path: PathBuf,

    /// Size in bytes above which the day's file is rotated
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Files whose last modification is older than this are deleted
    #[serde(default = "default_max_days")]
    pub max_days: u32,

    /// One sub-folder per severity
    #[serde(default = "default_true")]
    pub group_by_level: bool,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl FileConfig {
    /// Config rooted at `folder_path` with defaults for everything else
    pub fn new(folder_path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            filter: SinkFilter::default(),
            folder_path: folder_path.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_days: DEFAULT_RETENTION_DAYS,
            group_by_level: true,
        }
    }
}

/// Remote sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub filter: SinkFilter,

    /// Events kept while the connection is not ready
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    /// Where messages go
    pub destination: RemoteDestination,
}

fn default_pending_capacity() -> usize {
    DEFAULT_PENDING_CAPACITY
}

impl RemoteConfig {
    pub fn new(destination: RemoteDestination) -> Self {
        Self {
            enabled: true,
            filter: SinkFilter::default(),
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            destination,
        }
    }
}

/// Remote destination: a direct message or a guild channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteDestination {
    /// Direct message to a single user
    DirectMessage { dm_user_id: String },

    /// Guild channel, fixed or created per tag under a category
    Guild {
        guild_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
}

impl RemoteDestination {
    pub fn direct_message(user_id: impl Into<String>) -> Self {
        Self::DirectMessage {
            dm_user_id: user_id.into(),
        }
    }

    pub fn fixed_channel(guild_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::Guild {
            guild_id: guild_id.into(),
            channel: Some(channel.into()),
            category: None,
        }
    }

    pub fn tag_category(guild_id: impl Into<String>, category: impl Into<String>) -> Self {
        Self::Guild {
            guild_id: guild_id.into(),
            channel: None,
            category: Some(category.into()),
        }
    }
}
