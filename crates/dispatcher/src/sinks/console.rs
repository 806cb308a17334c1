//! ConsoleSink - pretty blocks on stdout or an injected writer

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use tracing::instrument;

use contracts::{ConsoleConfig, ContractError, Event, LogSink, Severity, SinkFilter, SinkKind};

const SEPARATOR_WIDTH: usize = 70;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GRAY: &str = "\x1b[90m";
    pub const WHITE: &str = "\x1b[97m";
    pub const CYAN: &str = "\x1b[96m";
    pub const GREEN: &str = "\x1b[92m";
    pub const YELLOW: &str = "\x1b[93m";
    pub const RED: &str = "\x1b[91m";
    pub const MAGENTA: &str = "\x1b[95m";
    pub const BLUE: &str = "\x1b[94m";
}

/// Color, symbol and short label for a severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStyle {
    pub color: &'static str,
    pub symbol: &'static str,
    pub label: &'static str,
}

pub fn level_style(severity: Severity) -> LevelStyle {
    let (color, symbol, label) = match severity {
        Severity::Debug => (ansi::MAGENTA, "◆", "DEBUG"),
        Severity::Information => (ansi::BLUE, "●", "INFO"),
        Severity::Success => (ansi::GREEN, "✔", "SUCCESS"),
        Severity::Warning => (ansi::YELLOW, "▲", "WARN"),
        Severity::Error => (ansi::RED, "✖", "ERROR"),
        Severity::Fatal => (ansi::RED, "☠", "FATAL"),
    };
    LevelStyle {
        color,
        symbol,
        label,
    }
}

/// Sink that prints a framed block per event
pub struct ConsoleSink {
    filter: SinkFilter,
    show_attributes: bool,
    colored: bool,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Create a ConsoleSink writing to stdout
    pub fn new(config: &ConsoleConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    /// Create a ConsoleSink writing to `writer`
    pub fn with_writer(config: &ConsoleConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            filter: config.filter.clone(),
            show_attributes: config.show_attributes,
            colored: config.colored,
            writer: Mutex::new(writer),
        }
    }

    fn paint(&self, codes: &[&str], text: &str) -> String {
        if self.colored {
            format!("{}{}{}", codes.concat(), text, ansi::RESET)
        } else {
            text.to_string()
        }
    }

    /// Render the block for one event, without a trailing newline
    pub fn format_event(&self, event: &Event) -> String {
        let style = level_style(event.severity);
        let timestamp = event
            .timestamp
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S");
        let separator = self.paint(&[ansi::GRAY], &"─".repeat(SEPARATOR_WIDTH));
        let gutter = self.paint(&[ansi::GRAY], "│ ");

        let mut lines = vec![
            separator.clone(),
            format!(
                "{}{}",
                self.paint(
                    &[style.color, ansi::BOLD],
                    &format!("{}  {:<7}", style.symbol, style.label)
                ),
                self.paint(&[ansi::GRAY], &format!("  {timestamp}"))
            ),
        ];

        if let Some(tag) = &event.tag {
            lines.push(format!(
                "{}{}",
                self.paint(&[ansi::GRAY], "│ Tag    : "),
                self.paint(&[ansi::DIM], tag)
            ));
        }
        lines.push(format!(
            "{gutter}{}",
            self.paint(&[ansi::WHITE], &event.message)
        ));

        if self.show_attributes {
            if let Some(attributes) = event.non_empty_attributes() {
                let pretty = serde_json::to_string_pretty(attributes)
                    .unwrap_or_else(|e| format!("<unprintable attributes: {e}>"));
                lines.push(self.paint(&[ansi::GRAY], "│ Infos :"));
                lines.extend(
                    pretty
                        .lines()
                        .map(|line| format!("{gutter}{}", self.paint(&[ansi::CYAN], line))),
                );
            }
        }

        lines.push(separator);
        lines.join("\n")
    }

    fn writer(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &str {
        SinkKind::Console.as_str()
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn filter(&self) -> &SinkFilter {
        &self.filter
    }

    #[instrument(
        name = "console_sink_log",
        skip(self, event),
        fields(severity = %event.severity)
    )]
    async fn log(&self, event: &Event) -> Result<(), ContractError> {
        if !self.filter.accepts(event) {
            return Ok(());
        }

        let mut block = self.format_event(event);
        block.push('\n');

        let mut writer = self.writer();
        let written = writer.write_all(block.as_bytes());
        written
            .and_then(|()| writer.flush())
            .map_err(|e| ContractError::sink_write(self.name(), e.to_string()))
    }
}
