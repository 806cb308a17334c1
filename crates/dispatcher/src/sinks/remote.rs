//! RemoteSink - chat channel delivery with a pre-ready queue
//!
//! The sink moves through three states:
//!
//! - `Disconnected`: no connection handle yet, events are queued
//! - `NotReady`: a handle exists but cannot send yet, events are queued
//! - `Ready`: events are sent directly
//!
//! The queue is bounded; when it is full the incoming event is dropped.
//! It is drained exactly once per handle, when that handle becomes ready.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{
    ContractError, Event, LogSink, RemoteConfig, RemoteDestination, Severity, SinkFilter, SinkKind,
};
use observability::DIAGNOSTICS_TARGET;
use remote_client::{Channel, Embed, EmbedField, EmbedFooter, Message, RemoteConnection, RemoteError};

/// Prefix of channels created per tag under a category
pub const TAG_CHANNEL_PREFIX: &str = "📋│";

/// Embed field holding the attributes
pub const ATTRIBUTES_FIELD: &str = "Informations";

/// Observable state of the remote sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Disconnected,
    NotReady,
    Ready,
}

enum Connection {
    Disconnected,
    NotReady(Arc<dyn RemoteConnection>),
    Ready(Arc<dyn RemoteConnection>),
}

impl Connection {
    fn state(&self) -> RemoteState {
        match self {
            Connection::Disconnected => RemoteState::Disconnected,
            Connection::NotReady(_) => RemoteState::NotReady,
            Connection::Ready(_) => RemoteState::Ready,
        }
    }
}

struct Inner {
    connection: Connection,
    pending: VecDeque<Event>,
    /// Bumped on every `set_connection`; a flush for an older handle is ignored
    generation: u64,
    listener: Option<JoinHandle<()>>,
}

struct Shared {
    filter: SinkFilter,
    capacity: usize,
    destination: RemoteDestination,
    inner: Mutex<Inner>,
    dropped: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Promote `NotReady` to `Ready` and deliver the queue in order
    #[instrument(name = "remote_sink_flush", skip(self))]
    async fn flush(&self, generation: u64) {
        let (handle, drained) = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            let handle = match &inner.connection {
                Connection::NotReady(handle) => Arc::clone(handle),
                // Already flushed for this handle
                _ => return,
            };
            inner.connection = Connection::Ready(Arc::clone(&handle));
            inner.listener = None;
            let drained: Vec<Event> = inner.pending.drain(..).collect();
            (handle, drained)
        };
        observability::record_queue_depth(0);

        if !drained.is_empty() {
            info!(events = drained.len(), "Flushing queued remote events");
        }
        for event in &drained {
            if let Err(e) = self.send(handle.as_ref(), event).await {
                warn!(
                    target: DIAGNOSTICS_TARGET,
                    sink = SinkKind::Remote.as_str(),
                    error = %e,
                    "Queued remote event not delivered"
                );
            }
        }
    }

    /// Resolve a route for `event` and post it
    async fn send(&self, connection: &dyn RemoteConnection, event: &Event) -> Result<(), RemoteError> {
        let message = build_message(event);

        let channel = match &self.destination {
            RemoteDestination::DirectMessage { dm_user_id } => {
                connection.fetch_user(dm_user_id).await?
            }
            RemoteDestination::Guild {
                guild_id,
                channel,
                category,
            } => {
                let guild = connection.guild(guild_id).await?;
                if let Some(channel_id) = channel {
                    guild
                        .channel(channel_id)
                        .ok_or_else(|| RemoteError::ChannelNotFound {
                            channel_id: channel_id.clone(),
                        })?
                } else if let (Some(category), Some(tag)) = (category, &event.tag) {
                    let name = tag_channel_name(tag);
                    match guild.channel_by_name(&name) {
                        Some(existing) => existing,
                        None => {
                            let created = guild.create_channel(&name, category).await?;
                            info!(channel = %name, guild_id = %guild_id, "Tag channel created");
                            created
                        }
                    }
                } else {
                    warn!(
                        target: DIAGNOSTICS_TARGET,
                        sink = SinkKind::Remote.as_str(),
                        "No usable destination (a channel, or a category and a tagged event, is required)"
                    );
                    return Ok(());
                }
            }
        };

        post(channel.as_ref(), &message).await
    }
}

async fn post(channel: &dyn Channel, message: &Message) -> Result<(), RemoteError> {
    if !channel.is_sendable() {
        return Err(RemoteError::ChannelNotSendable {
            channel: channel.name().to_string(),
        });
    }
    channel.send(message).await
}

/// Sink that posts embeds to a chat platform
pub struct RemoteSink {
    shared: Arc<Shared>,
}

impl RemoteSink {
    /// Create a disconnected RemoteSink
    pub fn new(config: &RemoteConfig) -> Result<Self, ContractError> {
        if config.pending_capacity == 0 {
            return Err(ContractError::config_validation(
                "remote.pending_capacity",
                "must be greater than 0",
            ));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                filter: config.filter.clone(),
                capacity: config.pending_capacity,
                destination: config.destination.clone(),
                inner: Mutex::new(Inner {
                    connection: Connection::Disconnected,
                    pending: VecDeque::with_capacity(config.pending_capacity),
                    generation: 0,
                    listener: None,
                }),
                dropped: AtomicU64::new(0),
            }),
        })
    }

    /// Install or replace the connection handle
    ///
    /// A ready handle flushes the queue before this returns; otherwise a
    /// listener flushes it once the handle reports ready. Any listener for a
    /// previous handle is cancelled.
    #[instrument(name = "remote_sink_set_connection", skip(self, connection))]
    pub async fn set_connection(&self, connection: Arc<dyn RemoteConnection>) {
        let generation = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            if let Some(listener) = inner.listener.take() {
                listener.abort();
            }
            inner.connection = Connection::NotReady(Arc::clone(&connection));
            inner.generation
        };

        if connection.is_ready() {
            self.shared.flush(generation).await;
            return;
        }

        debug!(generation, "Remote connection not ready, waiting");
        let shared = Arc::clone(&self.shared);
        let listener = tokio::spawn(async move {
            connection.wait_ready().await;
            shared.flush(generation).await;
        });

        let mut inner = self.shared.lock();
        if inner.generation == generation && !listener.is_finished() {
            inner.listener = Some(listener);
        }
    }

    pub fn state(&self) -> RemoteState {
        self.shared.lock().connection.state()
    }

    /// Events waiting for a ready connection
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Copy of the queued events, oldest first
    pub fn pending_events(&self) -> Vec<Event> {
        self.shared.lock().pending.iter().cloned().collect()
    }

    /// Events refused because the queue was full
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl Drop for RemoteSink {
    fn drop(&mut self) {
        if let Some(listener) = self.shared.lock().listener.take() {
            listener.abort();
        }
    }
}

impl LogSink for RemoteSink {
    fn name(&self) -> &str {
        SinkKind::Remote.as_str()
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Remote
    }

    fn filter(&self) -> &SinkFilter {
        &self.shared.filter
    }

    #[instrument(
        name = "remote_sink_log",
        skip(self, event),
        fields(severity = %event.severity)
    )]
    async fn log(&self, event: &Event) -> Result<(), ContractError> {
        if !self.shared.filter.accepts(event) {
            return Ok(());
        }

        let connection = {
            let mut inner = self.shared.lock();
            match &inner.connection {
                Connection::Ready(connection) => Arc::clone(connection),
                Connection::Disconnected | Connection::NotReady(_) => {
                    if inner.pending.len() < self.shared.capacity {
                        inner.pending.push_back(event.clone());
                        observability::record_queue_depth(inner.pending.len());
                    } else {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                        observability::record_queue_drop();
                        debug!(
                            target: DIAGNOSTICS_TARGET,
                            capacity = self.shared.capacity,
                            "Remote queue full, event dropped"
                        );
                    }
                    return Ok(());
                }
            }
        };

        self.shared
            .send(connection.as_ref(), event)
            .await
            .map_err(|e| ContractError::sink_write(self.name(), e.to_string()))
    }
}

/// Channel name used for a tag under a category
pub fn tag_channel_name(tag: &str) -> String {
    format!("{TAG_CHANNEL_PREFIX}{}", tag.to_lowercase())
}

/// Embed color per severity
pub fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::Debug => 0x9b59b6,
        Severity::Information => 0x3498db,
        Severity::Success => 0x2ecc71,
        Severity::Warning => 0xf39c12,
        Severity::Error => 0xe74c3c,
        Severity::Fatal => 0x8e0000,
    }
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "🟣",
        Severity::Information => "🔵",
        Severity::Success => "🟢",
        Severity::Warning => "🟠",
        Severity::Error => "🔴",
        Severity::Fatal => "💀",
    }
}

/// Build the chat message for one event
pub fn build_message(event: &Event) -> Message {
    let mut title = format!("{} {}", severity_emoji(event.severity), event.severity.label());
    if let Some(tag) = &event.tag {
        title.push_str(" — ");
        title.push_str(tag);
    }

    let fields = event
        .non_empty_attributes()
        .map(|attributes| {
            let pretty = serde_json::to_string_pretty(attributes)
                .unwrap_or_else(|e| format!("<unprintable attributes: {e}>"));
            vec![EmbedField::code_block(ATTRIBUTES_FIELD, "json", &pretty)]
        })
        .unwrap_or_default();

    Message::with_embed(Embed {
        title,
        description: format!("```{}```", event.message),
        color: severity_color(event.severity),
        footer: Some(EmbedFooter {
            text: event
                .timestamp
                .with_timezone(&Local)
                .format("%d/%m/%Y %H:%M:%S")
                .to_string(),
        }),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_client::{MockConfig, MockConnection, FIELD_VALUE_LIMIT};
    use std::collections::HashSet;
    use std::time::Duration;

    fn dm_config() -> RemoteConfig {
        RemoteConfig::new(RemoteDestination::direct_message("42"))
    }

    fn dm_connection(config: MockConfig) -> MockConnection {
        let connection = MockConnection::with_config(config);
        connection.add_user("42");
        connection
    }

    fn messages(connection: &MockConnection) -> Vec<String> {
        connection
            .deliveries()
            .iter()
            .map(|d| d.message.embeds[0].description.clone())
            .collect()
    }

    async fn wait_for_state(sink: &RemoteSink, state: RemoteState) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while sink.state() != state {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_queue_keeps_first_events_up_to_capacity() {
        let sink = RemoteSink::new(&dm_config()).unwrap();
        assert_eq!(sink.state(), RemoteState::Disconnected);

        for i in 0..101 {
            sink.log(&Event::new(Severity::Information, format!("e{i}")))
                .await
                .unwrap();
        }

        let pending = sink.pending_events();
        assert_eq!(pending.len(), 100);
        assert_eq!(pending[0].message, "e0");
        assert_eq!(pending[99].message, "e99");
        assert_eq!(sink.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_ready_connection_flushes_in_order_then_sends_directly() {
        let sink = RemoteSink::new(&dm_config()).unwrap();
        for i in 0..3 {
            sink.log(&Event::new(Severity::Warning, format!("q{i}")))
                .await
                .unwrap();
        }

        let connection = dm_connection(MockConfig::default());
        connection.set_ready(true);
        sink.set_connection(Arc::new(connection.clone())).await;

        assert_eq!(sink.state(), RemoteState::Ready);
        assert_eq!(sink.pending_len(), 0);
        assert_eq!(messages(&connection), vec!["```q0```", "```q1```", "```q2```"]);

        sink.log(&Event::new(Severity::Error, "direct")).await.unwrap();
        assert_eq!(sink.pending_len(), 0);
        assert_eq!(messages(&connection).last().unwrap(), "```direct```");
    }

    #[tokio::test]
    async fn test_flush_continues_after_failed_send() {
        let sink = RemoteSink::new(&dm_config()).unwrap();
        for i in 1..=3 {
            sink.log(&Event::new(Severity::Information, format!("#{i}")))
                .await
                .unwrap();
        }

        let connection = dm_connection(MockConfig {
            fail_send_attempts: HashSet::from([2]),
            ..Default::default()
        });
        connection.set_ready(true);
        sink.set_connection(Arc::new(connection.clone())).await;

        assert_eq!(connection.send_attempts(), 3);
        assert_eq!(messages(&connection), vec!["```#1```", "```#3```"]);
    }

    #[tokio::test]
    async fn test_not_ready_handle_flushes_once_when_ready() {
        let sink = RemoteSink::new(&dm_config()).unwrap();
        let connection = dm_connection(MockConfig::default());

        sink.set_connection(Arc::new(connection.clone())).await;
        assert_eq!(sink.state(), RemoteState::NotReady);

        sink.log(&Event::new(Severity::Information, "early")).await.unwrap();
        assert_eq!(sink.pending_len(), 1);

        connection.set_ready(true);
        wait_for_state(&sink, RemoteState::Ready).await;

        // Toggling readiness again must not replay anything
        connection.set_ready(false);
        connection.set_ready(true);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(messages(&connection), vec!["```early```"]);
    }

    #[tokio::test]
    async fn test_replacing_handle_resets_state() {
        let sink = RemoteSink::new(&dm_config()).unwrap();

        let first = dm_connection(MockConfig::default());
        first.set_ready(true);
        sink.set_connection(Arc::new(first.clone())).await;
        assert_eq!(sink.state(), RemoteState::Ready);

        let second = dm_connection(MockConfig::default());
        sink.set_connection(Arc::new(second.clone())).await;
        assert_eq!(sink.state(), RemoteState::NotReady);

        sink.log(&Event::new(Severity::Information, "queued")).await.unwrap();
        assert_eq!(sink.pending_len(), 1);
        assert!(first.deliveries().is_empty());

        second.set_ready(true);
        wait_for_state(&sink, RemoteState::Ready).await;
        assert_eq!(messages(&second), vec!["```queued```"]);
        assert!(first.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_stale_listener_is_cancelled() {
        let sink = RemoteSink::new(&dm_config()).unwrap();
        let stale = dm_connection(MockConfig::default());
        sink.set_connection(Arc::new(stale.clone())).await;
        sink.log(&Event::new(Severity::Information, "x")).await.unwrap();

        let current = dm_connection(MockConfig::default());
        sink.set_connection(Arc::new(current.clone())).await;

        stale.set_ready(true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stale.deliveries().is_empty());
        assert_eq!(sink.state(), RemoteState::NotReady);
        assert_eq!(sink.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_fixed_channel_beats_tag_category() {
        let connection = MockConnection::ready();
        connection.add_guild("g", &[("c1", "logs")]);
        let config = RemoteConfig::new(RemoteDestination::Guild {
            guild_id: "g".into(),
            channel: Some("c1".into()),
            category: Some("cat".into()),
        });
        let sink = RemoteSink::new(&config).unwrap();
        sink.set_connection(Arc::new(connection.clone())).await;

        sink.log(&Event::new(Severity::Information, "m").with_tag("Auth"))
            .await
            .unwrap();

        let deliveries = connection.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].channel_id, "c1");
        assert!(connection.created_channels("g").is_empty());
    }

    #[tokio::test]
    async fn test_tag_channel_created_once_and_reused() {
        let connection = MockConnection::ready();
        connection.add_guild("g", &[]);
        let sink = RemoteSink::new(&RemoteConfig::new(RemoteDestination::tag_category("g", "cat")))
            .unwrap();
        sink.set_connection(Arc::new(connection.clone())).await;

        sink.log(&Event::new(Severity::Information, "a").with_tag("Auth"))
            .await
            .unwrap();
        sink.log(&Event::new(Severity::Information, "b").with_tag("AUTH"))
            .await
            .unwrap();

        assert_eq!(
            connection.created_channels("g"),
            vec![("📋│auth".to_string(), "cat".to_string())]
        );
        let deliveries = connection.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].channel_id, deliveries[1].channel_id);
    }

    #[tokio::test]
    async fn test_route_failures_reported_not_propagated_beyond_sink() {
        let connection = MockConnection::with_config(MockConfig {
            refuse_channel_creation: true,
            ..Default::default()
        });
        connection.set_ready(true);
        connection.add_guild("g", &[]);
        connection.add_unsendable_channel("g", "voice", "Voice");

        let category = RemoteSink::new(&RemoteConfig::new(RemoteDestination::tag_category("g", "cat")))
            .unwrap();
        category.set_connection(Arc::new(connection.clone())).await;
        assert!(category
            .log(&Event::new(Severity::Error, "x").with_tag("db"))
            .await
            .is_err());

        let unsendable = RemoteSink::new(&RemoteConfig::new(RemoteDestination::fixed_channel("g", "voice")))
            .unwrap();
        unsendable.set_connection(Arc::new(connection.clone())).await;
        assert!(unsendable.log(&Event::new(Severity::Error, "x")).await.is_err());

        let missing_guild = RemoteSink::new(&RemoteConfig::new(RemoteDestination::fixed_channel("nope", "c")))
            .unwrap();
        missing_guild.set_connection(Arc::new(connection.clone())).await;
        assert!(missing_guild.log(&Event::new(Severity::Error, "x")).await.is_err());

        // Category without a tag has no route: dropped quietly
        assert!(category.log(&Event::new(Severity::Error, "untagged")).await.is_ok());
        assert!(connection.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_filter_applies_before_queueing() {
        let mut config = dm_config();
        config.filter = SinkFilter::accept_all().with_min_level(Severity::Warning);
        let sink = RemoteSink::new(&config).unwrap();

        sink.log(&Event::new(Severity::Debug, "noise")).await.unwrap();
        assert_eq!(sink.pending_len(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = dm_config();
        config.pending_capacity = 0;
        assert!(RemoteSink::new(&config).is_err());
    }

    #[test]
    fn test_embed_layout() {
        let event = Event::new(Severity::Warning, "slow query")
            .with_tag("db")
            .with_attribute("ms", 950);
        let message = build_message(&event);
        let embed = &message.embeds[0];

        assert_eq!(embed.title, "🟠 WARNING — db");
        assert_eq!(embed.description, "```slow query```");
        assert_eq!(embed.color, 0xf39c12);
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, ATTRIBUTES_FIELD);
        assert!(embed.fields[0].value.starts_with("```json\n{"));
    }

    #[test]
    fn test_embed_truncates_large_attributes() {
        let event = Event::new(Severity::Debug, "big").with_attribute("blob", "x".repeat(5000));
        let message = build_message(&event);
        let value = &message.embeds[0].fields[0].value;
        assert_eq!(value.chars().count(), FIELD_VALUE_LIMIT);
        assert!(value.ends_with("…```"));
        assert_eq!(message.embeds[0].title, "🟣 DEBUG");
    }
}
