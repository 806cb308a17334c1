//! Remote connection abstraction
//!
//! Defines traits for interacting with a chat platform, supporting a real
//! REST implementation and mock testing. The traits are object-safe so a
//! sink can hold any connection behind `Arc<dyn RemoteConnection>`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// Chat platform connection
///
/// A connection may exist before it can be used; `is_ready` reports
/// whether sends are currently accepted and `wait_ready` resolves the
/// first time that becomes true.
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    /// Whether the connection currently accepts sends
    fn is_ready(&self) -> bool;

    /// Resolve once the connection is ready
    ///
    /// Resolves immediately if it already is.
    async fn wait_ready(&self);

    /// Look up a user and open a direct-message target for them
    async fn fetch_user(&self, user_id: &str) -> Result<Arc<dyn Channel>>;

    /// Look up a guild, using the connection's cache when possible
    async fn guild(&self, guild_id: &str) -> Result<Arc<dyn Guild>>;
}

/// A guild (server) with a cached channel list
#[async_trait]
pub trait Guild: Send + Sync {
    fn id(&self) -> &str;

    /// Cached channel by id
    fn channel(&self, channel_id: &str) -> Option<Arc<dyn Channel>>;

    /// Cached channel by exact name
    fn channel_by_name(&self, name: &str) -> Option<Arc<dyn Channel>>;

    /// Create a text channel under `parent_id` and add it to the cache
    async fn create_channel(&self, name: &str, parent_id: &str) -> Result<Arc<dyn Channel>>;
}

/// Anything a message can be posted to
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Text-based and postable by us
    fn is_sendable(&self) -> bool;

    async fn send(&self, message: &Message) -> Result<()>;
}
