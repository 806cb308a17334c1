//! `pipe` command implementation.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use contracts::Event;

use crate::cli::PipeArgs;
use crate::error::CliError;
use crate::session::Session;

/// Execute the `pipe` command
///
/// Reads one JSON event per line from stdin until EOF or Ctrl+C.
pub async fn run_pipe(args: &PipeArgs) -> Result<()> {
    let mut session = Session::open(&args.dispatch).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut line_no = 0;
    let mut skipped = 0_u64;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping input");
                break;
            }
        };
        let Some(line) = line else { break };
        line_no += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_event_line(line_no, line) {
            Ok(event) => {
                session.dispatch(&event).await;
            }
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping input line");
            }
        }
    }

    let summary = session.finish();
    info!(
        events = summary.total_events,
        skipped,
        failures = summary.total_failures(),
        "Input closed"
    );
    if args.summary {
        eprint!("{summary}");
    }
    Ok(())
}

fn parse_event_line(line_no: usize, line: &str) -> Result<Event, CliError> {
    serde_json::from_str(line).map_err(|e| CliError::invalid_event(line_no, e.to_string()))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No handler available: never resolve
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Severity;

    #[test]
    fn test_parse_event_line_defaults_timestamp() {
        let event =
            parse_event_line(1, r#"{"severity":"warn","message":"disk","tag":"io"}"#).unwrap();
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.tag.as_deref(), Some("io"));
        assert!(event.attributes.is_none());
    }

    #[test]
    fn test_parse_event_line_with_attributes_and_timestamp() {
        let event = parse_event_line(
            2,
            r#"{"severity":"error","message":"x","attributes":{"a":1},"timestamp":"2024-03-09T13:45:00Z"}"#,
        )
        .unwrap();
        assert_eq!(event.attributes.unwrap()["a"], 1);
        assert_eq!(event.timestamp.to_rfc3339(), "2024-03-09T13:45:00+00:00");
    }

    #[test]
    fn test_parse_event_line_reports_line_number() {
        let err = parse_event_line(7, "not json").unwrap_err();
        assert!(matches!(err, CliError::InvalidEvent { line: 7, .. }));
    }
}
