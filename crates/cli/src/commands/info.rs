//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LoggerBlueprint, RemoteDestination, SinkFilter, SinkKind};

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    kind: SinkKind,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_level: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allow_tags: Vec<String>,
    /// Sink-specific settings, in display order
    settings: Vec<(String, String)>,
}

impl SinkInfo {
    fn new(kind: SinkKind, enabled: bool, filter: &SinkFilter) -> Self {
        Self {
            kind,
            enabled,
            min_level: filter.min_level.map(|l| l.to_string()),
            allow_tags: filter
                .allow_tags
                .as_ref()
                .map(|tags| tags.iter().cloned().collect())
                .unwrap_or_default(),
            settings: Vec::new(),
        }
    }

    fn setting(mut self, key: &str, value: impl ToString) -> Self {
        self.settings.push((key.to_string(), value.to_string()));
        self
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &LoggerBlueprint) -> ConfigInfo {
    let mut sinks = Vec::with_capacity(3);

    if let Some(console) = &blueprint.console {
        sinks.push(
            SinkInfo::new(SinkKind::Console, console.enabled, &console.filter)
                .setting("show_attributes", console.show_attributes)
                .setting("colored", console.colored),
        );
    }

    if let Some(file) = &blueprint.file {
        sinks.push(
            SinkInfo::new(SinkKind::File, file.enabled, &file.filter)
                .setting("folder_path", file.folder_path.display())
                .setting("max_file_size", file.max_file_size)
                .setting("max_days", file.max_days)
                .setting("group_by_level", file.group_by_level),
        );
    }

    if let Some(remote) = &blueprint.remote {
        let sink = SinkInfo::new(SinkKind::Remote, remote.enabled, &remote.filter)
            .setting("pending_capacity", remote.pending_capacity);
        let sink = match &remote.destination {
            RemoteDestination::DirectMessage { dm_user_id } => {
                sink.setting("dm_user_id", dm_user_id)
            }
            RemoteDestination::Guild {
                guild_id,
                channel,
                category,
            } => {
                let mut sink = sink.setting("guild_id", guild_id);
                if let Some(channel) = channel {
                    sink = sink.setting("channel", channel);
                }
                if let Some(category) = category {
                    sink = sink.setting("category", category);
                }
                sink
            }
        };
        sinks.push(sink);
    }

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  multilog Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📄 Version: {}", info.version);

    println!("\n📤 Sinks ({})", info.sinks.len());
    for (i, sink) in info.sinks.iter().enumerate() {
        let is_last = i == info.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let state = if sink.enabled { "enabled" } else { "disabled" };

        println!("   {} {} ({})", prefix, sink.kind, state);
        println!(
            "   {}  ├─ min_level: {}",
            child_prefix,
            sink.min_level.as_deref().unwrap_or("(all)")
        );
        println!(
            "   {}  ├─ allow_tags: {}",
            child_prefix,
            if sink.allow_tags.is_empty() {
                "(all)".to_string()
            } else {
                sink.allow_tags.join(", ")
            }
        );
        for (j, (key, value)) in sink.settings.iter().enumerate() {
            let setting_prefix = if j == sink.settings.len() - 1 { "└─" } else { "├─" };
            println!("   {}  {} {}: {}", child_prefix, setting_prefix, key, value);
        }
    }

    println!();
}
