//! REST remote connection
//!
//! Talks to a Discord-compatible HTTP API with a bot token. The connection
//! becomes ready after `connect` has verified the token; guild channel
//! lists are fetched once per guild and kept in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::client::{Channel, Guild, RemoteConnection};
use crate::error::{RemoteError, Result};
use crate::message::Message;

/// Default API root
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Channel types we can post embeds to (guild text, announcement, DM)
const SENDABLE_CHANNEL_TYPES: [u8; 3] = [0, 5, 1];

const GUILD_TEXT: u8 = 0;

/// REST connection settings
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Bot token (without the `Bot ` prefix)
    pub token: String,
    /// API root, without trailing slash
    pub api_base: String,
}

impl RestConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Serialize)]
struct CreateDm<'a> {
    recipient_id: &'a str,
}

#[derive(Serialize)]
struct CreateChannel<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    parent_id: &'a str,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared HTTP plumbing
#[derive(Clone)]
struct Api {
    http: Client,
    base: String,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> Result<Response> {
        self.http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::transport(e.to_string()))
    }
}

/// Map non-success statuses onto `RemoteError`
async fn check(response: Response, not_found: impl FnOnce() -> RemoteError, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => Err(not_found()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RemoteError::missing_permissions(action))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::transport(format!("{action}: HTTP {status}: {body}")))
        }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::transport(format!("decode error: {e}")))
}

/// REST connection
pub struct RestConnection {
    api: Api,
    ready: watch::Sender<bool>,
    guilds: Mutex<HashMap<String, Arc<RestGuild>>>,
}

impl RestConnection {
    /// Build the HTTP client; the connection is not ready until `connect`
    pub fn new(config: RestConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bot {}", config.token))
            .map_err(|e| RemoteError::transport(format!("invalid token: {e}")))?;
        headers.insert(header::AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("multilog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::transport(e.to_string()))?;

        let (ready, _) = watch::channel(false);
        Ok(Self {
            api: Api {
                http,
                base: config.api_base.trim_end_matches('/').to_string(),
            },
            ready,
            guilds: Mutex::new(HashMap::new()),
        })
    }

    /// Verify the token and mark the connection ready
    #[instrument(name = "rest_remote_connect", skip(self))]
    pub async fn connect(&self) -> Result<()> {
        let response = self.api.get("/users/@me").await?;
        let response = check(response, || RemoteError::NotReady, "identify").await?;
        let me: ApiUser = decode(response).await?;
        info!(user_id = %me.id, username = %me.username, "Remote connection ready");
        self.ready.send_replace(true);
        Ok(())
    }

    fn cached_guild(&self, guild_id: &str) -> Option<Arc<RestGuild>> {
        lock(&self.guilds).get(guild_id).cloned()
    }
}

#[async_trait]
impl RemoteConnection for RestConnection {
    fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    #[instrument(name = "rest_remote_fetch_user", skip(self))]
    async fn fetch_user(&self, user_id: &str) -> Result<Arc<dyn Channel>> {
        let response = self
            .api
            .post("/users/@me/channels", &CreateDm { recipient_id: user_id })
            .await?;
        let response = check(
            response,
            || RemoteError::UserNotFound {
                user_id: user_id.to_string(),
            },
            "open a direct message",
        )
        .await?;
        let channel: ApiChannel = decode(response).await?;
        Ok(Arc::new(RestChannel::from_api(
            self.api.clone(),
            channel,
            format!("dm-{user_id}"),
        )))
    }

    #[instrument(name = "rest_remote_guild", skip(self))]
    async fn guild(&self, guild_id: &str) -> Result<Arc<dyn Guild>> {
        if let Some(guild) = self.cached_guild(guild_id) {
            return Ok(guild);
        }

        let response = self
            .api
            .get(&format!("/guilds/{guild_id}/channels"))
            .await?;
        let response = check(
            response,
            || RemoteError::GuildNotFound {
                guild_id: guild_id.to_string(),
            },
            "list guild channels",
        )
        .await?;
        let channels: Vec<ApiChannel> = decode(response).await?;
        debug!(guild_id, channels = channels.len(), "Guild channels cached");

        let guild = Arc::new(RestGuild {
            id: guild_id.to_string(),
            api: self.api.clone(),
            channels: Mutex::new(
                channels
                    .into_iter()
                    .map(|c| Arc::new(RestChannel::from_api(self.api.clone(), c, String::new())))
                    .collect(),
            ),
        });
        let guild = Arc::clone(
            lock(&self.guilds)
                .entry(guild_id.to_string())
                .or_insert(guild),
        );
        Ok(guild)
    }
}

/// Guild with a cached channel list
pub struct RestGuild {
    id: String,
    api: Api,
    channels: Mutex<Vec<Arc<RestChannel>>>,
}

#[async_trait]
impl Guild for RestGuild {
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

    #[instrument(name = "rest_remote_create_channel", skip(self), fields(guild_id = %self.id))]
    async fn create_channel(&self, name: &str, parent_id: &str) -> Result<Arc<dyn Channel>> {
        let body = CreateChannel {
            name,
            kind: GUILD_TEXT,
            parent_id,
        };
        let response = self
            .api
            .post(&format!("/guilds/{}/channels", self.id), &body)
            .await?;
        let response = check(
            response,
            || RemoteError::channel_creation(name, "guild or category not found"),
            "create channels",
        )
        .await?;
        let created: ApiChannel = decode(response).await?;

        // Keep the requested name: the API may normalize it, and lookups use ours
        let channel = Arc::new(RestChannel::from_api(self.api.clone(), created, name.to_string()));
        lock(&self.channels).push(Arc::clone(&channel));
        Ok(channel)
    }
}

/// Postable channel
pub struct RestChannel {
    id: String,
    name: String,
    kind: u8,
    api: Api,
}

impl RestChannel {
    fn from_api(api: Api, channel: ApiChannel, fallback_name: String) -> Self {
        let name = if fallback_name.is_empty() {
            channel.name.unwrap_or_default()
        } else {
            fallback_name
        };
        Self {
            id: channel.id,
            name,
            kind: channel.kind,
            api,
        }
    }
}

#[async_trait]
impl Channel for RestChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_sendable(&self) -> bool {
        SENDABLE_CHANNEL_TYPES.contains(&self.kind)
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let response = self
            .api
            .post(&format!("/channels/{}/messages", self.id), message)
            .await
            .map_err(|e| RemoteError::send(&self.name, e.to_string()))?;
        check(
            response,
            || RemoteError::ChannelNotFound {
                channel_id: self.id.clone(),
            },
            "send messages",
        )
        .await?;
        Ok(())
    }
}
