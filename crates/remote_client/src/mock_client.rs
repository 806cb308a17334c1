//! Mock remote connection
//!
//! In-memory implementation for tests and demos, supporting readiness
//! toggling and injected failures. Every successful send is recorded.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::instrument;

use crate::client::{Channel, Guild, RemoteConnection};
use crate::error::{RemoteError, Result};
use crate::message::Message;

/// Mock connection configuration
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Send attempts (1-based, counted across the whole connection) that fail
    pub fail_send_attempts: HashSet<usize>,
    /// Refuse every channel creation
    pub refuse_channel_creation: bool,
}

/// One recorded delivery
#[derive(Debug, Clone)]
pub struct Delivery {
    pub channel_id: String,
    pub channel_name: String,
    pub message: Message,
}

struct MockState {
    config: MockConfig,
    send_attempts: AtomicUsize,
    next_channel_id: AtomicUsize,
    deliveries: Mutex<Vec<Delivery>>,
    users: Mutex<HashSet<String>>,
    guilds: Mutex<HashMap<String, Arc<MockGuild>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock connection
///
/// Cheap to clone; clones share readiness, guilds and recorded deliveries.
#[derive(Clone)]
pub struct MockConnection {
    ready: Arc<watch::Sender<bool>>,
    state: Arc<MockState>,
}

impl MockConnection {
    /// Create a connection that is not ready yet
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a connection that is already ready
    pub fn ready() -> Self {
        let connection = Self::new();
        connection.set_ready(true);
        connection
    }

    /// Create a not-ready connection with injected failures
    pub fn with_config(config: MockConfig) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            ready: Arc::new(ready),
            state: Arc::new(MockState {
                config,
                send_attempts: AtomicUsize::new(0),
                next_channel_id: AtomicUsize::new(9000),
                deliveries: Mutex::new(Vec::new()),
                users: Mutex::new(HashSet::new()),
                guilds: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Flip readiness, waking anything in `wait_ready`
    pub fn set_ready(&self, ready: bool) {
        self.ready.send_replace(ready);
    }

    /// Register a user that can receive direct messages
    pub fn add_user(&self, user_id: impl Into<String>) -> &Self {
        lock(&self.state.users).insert(user_id.into());
        self
    }

    /// Register a guild with `(id, name)` text channels
    pub fn add_guild(&self, guild_id: impl Into<String>, channels: &[(&str, &str)]) -> &Self {
        let guild_id = guild_id.into();
        let guild = Arc::new(MockGuild {
            id: guild_id.clone(),
            state: Arc::clone(&self.state),
            channels: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        });
        for (id, name) in channels {
            guild.insert_channel(id, name, None, true);
        }
        lock(&self.state.guilds).insert(guild_id, guild);
        self
    }

    /// Register a channel that exists but cannot be posted to
    pub fn add_unsendable_channel(&self, guild_id: &str, channel_id: &str, name: &str) {
        if let Some(guild) = lock(&self.state.guilds).get(guild_id) {
            guild.insert_channel(channel_id, name, None, false);
        }
    }

    /// Successful deliveries, in order
    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.state.deliveries).clone()
    }

    /// Number of send attempts, failed ones included
    pub fn send_attempts(&self) -> usize {
        self.state.send_attempts.load(Ordering::SeqCst)
    }

    /// Names of channels created through `create_channel` in a guild
    pub fn created_channels(&self, guild_id: &str) -> Vec<(String, String)> {
        lock(&self.state.guilds)
            .get(guild_id)
            .map(|g| lock(&g.created).clone())
            .unwrap_or_default()
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteConnection for MockConnection {
    fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // Sender lives as long as self, so this only errors on teardown
        let _ = rx.wait_for(|ready| *ready).await;
    }

    #[instrument(name = "mock_remote_fetch_user", skip(self))]
    async fn fetch_user(&self, user_id: &str) -> Result<Arc<dyn Channel>> {
        if !self.is_ready() {
            return Err(RemoteError::NotReady);
        }
        if !lock(&self.state.users).contains(user_id) {
            return Err(RemoteError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }
        Ok(Arc::new(MockChannel {
            id: format!("dm-{user_id}"),
            name: format!("dm-{user_id}"),
            parent_id: None,
            sendable: true,
            state: Arc::clone(&self.state),
        }))
    }

    #[instrument(name = "mock_remote_guild", skip(self))]
    async fn guild(&self, guild_id: &str) -> Result<Arc<dyn Guild>> {
        if !self.is_ready() {
            return Err(RemoteError::NotReady);
        }
        lock(&self.state.guilds)
            .get(guild_id)
            .map(|g| Arc::clone(g) as Arc<dyn Guild>)
            .ok_or_else(|| RemoteError::GuildNotFound {
                guild_id: guild_id.to_string(),
            })
    }
}

/// Mock guild
pub struct MockGuild {
    id: String,
    state: Arc<MockState>,
    channels: Mutex<Vec<Arc<MockChannel>>>,
    created: Mutex<Vec<(String, String)>>,
}

impl MockGuild {
    fn insert_channel(
        &self,
        id: &str,
        name: &str,
        parent_id: Option<&str>,
        sendable: bool,
    ) -> Arc<MockChannel> {
        let channel = Arc::new(MockChannel {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            sendable,
            state: Arc::clone(&self.state),
        });
        lock(&self.channels).push(Arc::clone(&channel));
        channel
    }
}

#[async_trait]
impl Guild for MockGuild {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel(&self, channel_id: &str) -> Option<Arc<dyn Channel>> {
        lock(&self.channels)
            .iter()
            .find(|c| c.id == channel_id)
            .map(|c| Arc::clone(c) as Arc<dyn Channel>)
    }

    fn channel_by_name(&self, name: &str) -> Option<Arc<dyn Channel>> {
        lock(&self.channels)
            .iter()
            .find(|c| c.name == name)
            .map(|c| Arc::clone(c) as Arc<dyn Channel>)
    }

    async fn create_channel(&self, name: &str, parent_id: &str) -> Result<Arc<dyn Channel>> {
        if self.state.config.refuse_channel_creation {
            return Err(RemoteError::missing_permissions("manage channels"));
        }
        let id = self
            .state
            .next_channel_id
            .fetch_add(1, Ordering::SeqCst)
            .to_string();
        let channel = self.insert_channel(&id, name, Some(parent_id), true);
        lock(&self.created).push((name.to_string(), parent_id.to_string()));
        Ok(channel)
    }
}

/// Mock channel
pub struct MockChannel {
    id: String,
    name: String,
    parent_id: Option<String>,
    sendable: bool,
    state: Arc<MockState>,
}

impl MockChannel {
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_sendable(&self) -> bool {
        self.sendable
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let attempt = self.state.send_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.state.config.fail_send_attempts.contains(&attempt) {
            return Err(RemoteError::send(&self.name, format!("injected failure #{attempt}")));
        }
        lock(&self.state.deliveries).push(Delivery {
            channel_id: self.id.clone(),
            channel_name: self.name.clone(),
            message: message.clone(),
        });
        Ok(())
    }
}
