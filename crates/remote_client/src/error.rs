//! Remote client error types

use thiserror::Error;

/// Remote client specific error
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection is not usable yet
    #[error("remote connection is not ready")]
    NotReady,

    /// User lookup failed
    #[error("user '{user_id}' not found")]
    UserNotFound { user_id: String },

    /// Guild lookup failed
    #[error("guild '{guild_id}' not found")]
    GuildNotFound { guild_id: String },

    /// Channel lookup failed
    #[error("channel '{channel_id}' not found")]
    ChannelNotFound { channel_id: String },

    /// Channel exists but is not a text channel we may post in
    #[error("channel '{channel}' is not sendable")]
    ChannelNotSendable { channel: String },

    /// The bot lacks a permission
    #[error("missing permissions to {action}")]
    MissingPermissions { action: String },

    /// Channel creation refused or failed
    #[error("failed to create channel '{name}': {message}")]
    ChannelCreation { name: String, message: String },

    /// Message delivery failed
    #[error("failed to send to channel '{channel}': {message}")]
    Send { channel: String, message: String },

    /// HTTP / transport failure
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl RemoteError {
    /// Create send error
    pub fn send(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create missing permissions error
    pub fn missing_permissions(action: impl Into<String>) -> Self {
        Self::MissingPermissions {
            action: action.into(),
        }
    }

    /// Create channel creation error
    pub fn channel_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RemoteError>;
