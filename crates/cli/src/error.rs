//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// `--attr` value without `=`
    #[error("Invalid attribute '{raw}': expected KEY=VALUE")]
    InvalidAttribute { raw: String },

    /// A `pipe` input line that is not an event
    #[error("Invalid event on line {line}: {message}")]
    InvalidEvent { line: usize, message: String },

    /// Remote connection could not be established
    #[error("Remote connection failed: {message}")]
    RemoteConnection { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_attribute(raw: impl Into<String>) -> Self {
        Self::InvalidAttribute { raw: raw.into() }
    }

    pub fn invalid_event(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            line,
            message: message.into(),
        }
    }

    pub fn remote_connection(message: impl Into<String>) -> Self {
        Self::RemoteConnection {
            message: message.into(),
        }
    }
}
