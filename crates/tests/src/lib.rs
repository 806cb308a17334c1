//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Config text to running dispatcher
//! - Mock remote e2e tests (no network)
//! - Sink isolation across the fan-out

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LoggerBlueprint, RemoteDestination, SinkKind};

    #[test]
    fn test_blueprint_survives_toml_and_json() {
        let toml = r#"
            [console]
            min_level = "warning"

            [file]
            folder_path = "./logs"
            max_days = 3

            [remote]
            allow_tags = ["billing"]
            destination = { guild_id = "10", category = "20" }
        "#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded: LoggerBlueprint = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(
            reloaded.enabled_sinks(),
            vec![SinkKind::Console, SinkKind::File, SinkKind::Remote]
        );
        assert_eq!(reloaded.file.unwrap().max_days, 3);
        assert_eq!(
            reloaded.remote.unwrap().destination,
            RemoteDestination::tag_category("10", "20")
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::{self, Write};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::Utc;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Event, Severity, SinkKind};
    use dispatcher::sinks::daily_file_name;
    use dispatcher::{DeliveryOutcome, Dispatcher, DispatcherBuilder, RemoteState};
    use remote_client::MockConnection;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn build(toml: &str, console: &SharedBuffer, remote: &MockConnection) -> Dispatcher {
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        DispatcherBuilder::new(blueprint)
            .console_writer(Box::new(console.clone()))
            .remote_connection(Arc::new(remote.clone()))
            .build()
            .await
            .unwrap()
    }

    /// Poll until the mock connection has recorded `count` deliveries
    async fn wait_for_deliveries(remote: &MockConnection, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while remote.deliveries().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("remote deliveries timed out");
    }

    fn config_for(folder: &Path, extra: &str) -> String {
        format!(
            r#"
            [console]
            colored = false

            [file]
            folder_path = "{}"
            {extra}

            [remote]
            pending_capacity = 10
            destination = {{ guild_id = "g1", channel = "c1" }}
            "#,
            folder.display().to_string().replace('\\', "/")
        )
    }

    /// End-to-end test: TOML -> ConfigLoader -> Dispatcher -> all three sinks
    ///
    /// Verifies the complete flow:
    /// 1. Console and file receive events immediately
    /// 2. Remote queues events while the connection is not ready
    /// 3. Readiness flushes the queue in order
    #[tokio::test]
    async fn test_e2e_config_to_all_sinks() {
        let dir = tempdir().unwrap();
        let console = SharedBuffer::default();
        let remote = MockConnection::new();
        remote.add_guild("g1", &[("c1", "alerts")]);

        let dispatcher = build(&config_for(dir.path(), ""), &console, &remote).await;
        assert_eq!(
            dispatcher.sink_kinds(),
            vec![SinkKind::Console, SinkKind::File, SinkKind::Remote]
        );

        let first = Event::new(Severity::Warning, "disk almost full").with_tag("storage");
        let second = Event::new(Severity::Error, "disk full").with_attribute("free", 0);

        for event in [&first, &second] {
            let report = dispatcher.dispatch(event).await;
            assert_eq!(report.delivered().len(), 3);
        }

        // Console and file saw both events right away
        let printed = console.contents();
        assert!(printed.contains("disk almost full"));
        assert!(printed.contains("Tag    : storage"));
        assert!(printed.contains("\"free\": 0"));

        let warning_file = dir
            .path()
            .join("warning")
            .join(daily_file_name(&Utc::now()));
        let written = std::fs::read_to_string(warning_file).unwrap();
        assert!(written.contains("Message : disk almost full"));
        assert!(dir
            .path()
            .join("error")
            .join(daily_file_name(&Utc::now()))
            .exists());

        // Remote is holding both
        let sink = dispatcher.remote().unwrap();
        assert_eq!(sink.state(), RemoteState::NotReady);
        assert_eq!(sink.pending_len(), 2);
        assert!(remote.deliveries().is_empty());

        remote.set_ready(true);
        wait_for_deliveries(&remote, 2).await;

        let deliveries = remote.deliveries();
        assert_eq!(deliveries[0].channel_id, "c1");
        assert!(deliveries[0].message.embeds[0]
            .description
            .contains("disk almost full"));
        assert!(deliveries[1].message.embeds[0].description.contains("disk full"));
        assert_eq!(sink.state(), RemoteState::Ready);
        assert_eq!(sink.pending_len(), 0);

        // Ready: sent directly
        let third = Event::new(Severity::Success, "recovered");
        dispatcher.dispatch(&third).await;
        assert_eq!(remote.deliveries().len(), 3);
    }

    #[tokio::test]
    async fn test_e2e_file_rotation_through_dispatcher() {
        let dir = tempdir().unwrap();
        let console = SharedBuffer::default();
        let remote = MockConnection::ready();
        remote.add_guild("g1", &[("c1", "alerts")]);

        let dispatcher = build(
            &config_for(dir.path(), "max_file_size = 64\ngroup_by_level = false"),
            &console,
            &remote,
        )
        .await;

        let event = Event::new(Severity::Information, "rotate me");
        for _ in 0..3 {
            let report = dispatcher.dispatch(&event).await;
            assert_eq!(report.outcome(SinkKind::File), Some(DeliveryOutcome::Delivered));
        }

        let name = daily_file_name(&Utc::now());
        let stem = name.trim_end_matches(".log");
        for file in [name.clone(), format!("{stem}_1.log"), format!("{stem}_2.log")] {
            let content = std::fs::read_to_string(dir.path().join(&file)).unwrap();
            assert_eq!(content.matches("rotate me").count(), 1, "{file}");
        }
    }

    #[tokio::test]
    async fn test_e2e_filters_route_per_sink() {
        let dir = tempdir().unwrap();
        let console = SharedBuffer::default();
        let remote = MockConnection::ready();
        remote.add_guild("g1", &[]);

        let toml = format!(
            r#"
            [console]
            min_level = "error"
            colored = false

            [file]
            folder_path = "{}"
            allow_tags = ["billing"]

            [remote]
            destination = {{ guild_id = "g1", category = "cat" }}
            "#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let dispatcher = build(&toml, &console, &remote).await;

        let billing = Event::new(Severity::Information, "invoice sent").with_tag("Billing");
        let report = dispatcher.dispatch(&billing).await;
        assert_eq!(report.outcome(SinkKind::Console), Some(DeliveryOutcome::Filtered));
        assert_eq!(report.outcome(SinkKind::File), Some(DeliveryOutcome::Filtered));
        assert_eq!(report.outcome(SinkKind::Remote), Some(DeliveryOutcome::Delivered));

        let tagged = Event::new(Severity::Fatal, "ledger corrupt").with_tag("billing");
        let report = dispatcher.dispatch(&tagged).await;
        assert_eq!(report.delivered().len(), 3);

        assert!(!console.contents().contains("invoice sent"));
        assert!(console.contents().contains("ledger corrupt"));

        // Tag channels are lower-cased so both events share one channel
        let created = remote.created_channels("g1");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1, dispatcher::sinks::tag_channel_name("billing"));
        assert_eq!(remote.deliveries().len(), 2);
    }

    #[tokio::test]
    async fn test_e2e_failing_file_sink_is_isolated() {
        let dir = tempdir().unwrap();
        // A regular file where the log folder should be
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let console = SharedBuffer::default();
        let remote = MockConnection::ready();
        remote.add_guild("g1", &[("c1", "alerts")]);
        let dispatcher = build(&config_for(&blocker, ""), &console, &remote).await;

        let report = dispatcher
            .dispatch(&Event::new(Severity::Error, "still reported"))
            .await;

        assert_eq!(report.outcome(SinkKind::File), Some(DeliveryOutcome::Failed));
        assert_eq!(report.outcome(SinkKind::Console), Some(DeliveryOutcome::Delivered));
        assert_eq!(report.outcome(SinkKind::Remote), Some(DeliveryOutcome::Delivered));
        assert!(console.contents().contains("still reported"));
        assert_eq!(remote.deliveries().len(), 1);

        let metrics = dispatcher.metrics();
        let (_, file) = metrics.iter().find(|(k, _)| *k == SinkKind::File).unwrap();
        assert_eq!(file.failure_count, 1);
    }

    #[tokio::test]
    async fn test_e2e_remote_queue_overflow_keeps_oldest() {
        let dir = tempdir().unwrap();
        let console = SharedBuffer::default();
        let remote = MockConnection::new();
        remote.add_guild("g1", &[("c1", "alerts")]);

        let toml = config_for(dir.path(), "").replace("pending_capacity = 10", "pending_capacity = 2");
        let dispatcher = build(&toml, &console, &remote).await;

        for i in 0..4 {
            dispatcher
                .dispatch(&Event::new(Severity::Information, format!("event {i}")))
                .await;
        }

        let sink = dispatcher.remote().unwrap();
        assert_eq!(sink.pending_len(), 2);
        assert_eq!(sink.dropped_count(), 2);

        remote.set_ready(true);
        wait_for_deliveries(&remote, 2).await;

        let deliveries = remote.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries[0].message.embeds[0].description.contains("event 0"));
        assert!(deliveries[1].message.embeds[0].description.contains("event 1"));
    }

    #[tokio::test]
    async fn test_e2e_delivery_summary_from_metrics() {
        let dir = tempdir().unwrap();
        let console = SharedBuffer::default();
        let remote = MockConnection::new();
        let dispatcher = build(&config_for(dir.path(), ""), &console, &remote).await;

        let mut summary = observability::DeliveryAggregator::new();
        for severity in [Severity::Debug, Severity::Fatal] {
            dispatcher.dispatch(&Event::new(severity, "counted")).await;
            summary.record_event();
        }
        for (kind, snapshot) in dispatcher.metrics() {
            summary.set_sink(kind, snapshot.into());
        }

        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.total_failures(), 0);
        assert!(summary.to_string().contains("Delivery Summary"));
    }
}
