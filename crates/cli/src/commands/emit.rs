//! `emit` command implementation.

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use contracts::Event;

use crate::cli::EmitArgs;
use crate::error::CliError;
use crate::session::Session;

/// Execute the `emit` command
pub async fn run_emit(args: &EmitArgs) -> Result<()> {
    let event = build_event(args)?;

    let mut session = Session::open(&args.dispatch).await?;
    let report = session.dispatch(&event).await;
    let summary = session.finish();

    info!(delivered = ?report.delivered(), "Event emitted");
    if summary.total_failures() > 0 {
        warn!(failures = summary.total_failures(), "Some sinks failed to deliver");
    }
    Ok(())
}

fn build_event(args: &EmitArgs) -> Result<Event, CliError> {
    let mut event = Event::new(args.level, args.message.clone());
    if let Some(tag) = &args.tag {
        event = event.with_tag(tag.clone());
    }
    for raw in &args.attrs {
        let (key, value) = parse_attribute(raw)?;
        event = event.with_attribute(key, value);
    }
    Ok(event)
}

/// Split `key=value`; the value is JSON if it parses as JSON, a string otherwise
fn parse_attribute(raw: &str) -> Result<(String, Value), CliError> {
    let (key, value) = raw
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| CliError::invalid_attribute(raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}
