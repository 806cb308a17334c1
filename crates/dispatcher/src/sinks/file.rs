//! FileSink - daily log files with size rotation and age retention
//!
//! Layout: `<folder>/<severity>/<YYYY-MM-DD>.log` (or `<folder>/<YYYY-MM-DD>.log`
//! when not grouping by level), rotated siblings `<YYYY-MM-DD>_<n>.log`.
//! All state is re-read from the directory on every write; nothing is
//! cached in memory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use contracts::{ContractError, Event, FileConfig, LogSink, Severity, SinkFilter, SinkKind};
use observability::DIAGNOSTICS_TARGET;

const SEPARATOR_WIDTH: usize = 100;
const LOG_EXTENSION: &str = "log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Sink that appends formatted entries to rotating daily files
pub struct FileSink {
    filter: SinkFilter,
    folder: PathBuf,
    max_file_size: u64,
    max_days: u32,
    group_by_level: bool,
    clock: fn() -> DateTime<Utc>,
}

impl FileSink {
    /// Create a new FileSink
    ///
    /// Nothing touches the disk until the first event.
    pub fn new(config: &FileConfig) -> Result<Self, ContractError> {
        if config.folder_path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                "file.folder_path",
                "must not be empty",
            ));
        }
        if config.max_file_size == 0 {
            return Err(ContractError::config_validation(
                "file.max_file_size",
                "must be greater than 0",
            ));
        }
        if config.max_days == 0 {
            return Err(ContractError::config_validation(
                "file.max_days",
                "must be greater than 0",
            ));
        }

        Ok(Self {
            filter: config.filter.clone(),
            folder: config.folder_path.clone(),
            max_file_size: config.max_file_size,
            max_days: config.max_days,
            group_by_level: config.group_by_level,
            clock: Utc::now,
        })
    }

    /// Replace the clock that picks the active day
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Directory an event of `severity` is written to
    pub fn directory_for(&self, severity: Severity) -> PathBuf {
        if self.group_by_level {
            self.folder.join(severity.as_str())
        } else {
            self.folder.clone()
        }
    }

    /// Today's active file for `severity`
    ///
    /// The day comes from the write-time UTC clock, never from the event,
    /// so backdated events land in the current file.
    pub fn path_for(&self, severity: Severity) -> PathBuf {
        self.directory_for(severity).join(daily_file_name(&(self.clock)()))
    }

    /// Rename the active file aside if it has grown past the limit
    ///
    /// Failures are reported and swallowed so the append still happens.
    #[instrument(name = "file_sink_rotate", skip(self))]
    async fn rotate_if_needed(&self, path: &Path) {
        let size = match fs::metadata(path).await {
            Ok(metadata) => metadata.len(),
            // Not created yet
            Err(_) => return,
        };
        if size <= self.max_file_size {
            return;
        }

        match rotate(path).await {
            Ok(rotated) => {
                observability::record_rotation();
                debug!(from = %path.display(), to = %rotated.display(), size, "Log file rotated");
            }
            Err(e) => {
                warn!(
                    target: DIAGNOSTICS_TARGET,
                    path = %path.display(),
                    error = %e,
                    "Log rotation failed"
                );
            }
        }
    }

    /// Delete files in `dir` last modified more than `max_days` ago
    ///
    /// Returns how many files were removed.
    #[instrument(name = "file_sink_retention", skip(self))]
    async fn sweep(&self, dir: &Path) -> usize {
        let max_age = Duration::from_secs(u64::from(self.max_days) * SECONDS_PER_DAY);
        let now = SystemTime::now();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(target: DIAGNOSTICS_TARGET, dir = %dir.display(), error = %e, "Retention listing failed");
                return 0;
            }
        };

        let mut deleted = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(target: DIAGNOSTICS_TARGET, dir = %dir.display(), error = %e, "Retention listing failed");
                    break;
                }
            };
            let path = entry.path();

            let expired = match entry.metadata().await.and_then(|m| {
                let modified = m.modified()?;
                Ok(m.is_file() && is_older_than(now, modified, max_age))
            }) {
                Ok(expired) => expired,
                Err(e) => {
                    warn!(target: DIAGNOSTICS_TARGET, path = %path.display(), error = %e, "Retention stat failed");
                    continue;
                }
            };
            if !expired {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    deleted += 1;
                    debug!(path = %path.display(), "Expired log file deleted");
                }
                Err(e) => {
                    warn!(target: DIAGNOSTICS_TARGET, path = %path.display(), error = %e, "Retention delete failed");
                }
            }
        }

        observability::record_retention_deleted(deleted);
        deleted
    }

    async fn append(&self, path: &Path, entry: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &str {
        SinkKind::File.as_str()
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn filter(&self) -> &SinkFilter {
        &self.filter
    }

    #[instrument(
        name = "file_sink_log",
        skip(self, event),
        fields(severity = %event.severity)
    )]
    async fn log(&self, event: &Event) -> Result<(), ContractError> {
        if !self.filter.accepts(event) {
            return Ok(());
        }

        let path = self.path_for(event.severity);
        let dir = self.directory_for(event.severity);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ContractError::sink_write(self.name(), format!("{}: {e}", dir.display())))?;

        self.rotate_if_needed(&path).await;

        self.append(&path, &format_entry(event))
            .await
            .map_err(|e| ContractError::sink_write(self.name(), format!("{}: {e}", path.display())))?;

        self.sweep(&dir).await;
        Ok(())
    }
}

/// `YYYY-MM-DD.log` for the UTC day of `timestamp`
pub fn daily_file_name(timestamp: &DateTime<Utc>) -> String {
    format!("{}.{LOG_EXTENSION}", timestamp.format("%Y-%m-%d"))
}

/// Render one file entry, trailing newline included
pub fn format_entry(event: &Event) -> String {
    let separator = "─".repeat(SEPARATOR_WIDTH);
    let mut entry = format!(
        "{separator}\n[{} | {}]\n",
        event.severity.label(),
        event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    if let Some(tag) = &event.tag {
        entry.push_str(&format!("Tag     : {tag}\n"));
    }
    entry.push_str(&format!("Message : {}\n", event.message));
    if let Some(attributes) = event.non_empty_attributes() {
        let pretty = serde_json::to_string_pretty(attributes)
            .unwrap_or_else(|e| format!("<unprintable attributes: {e}>"));
        entry.push_str(&format!("Infos   :\n{pretty}\n"));
    }
    entry.push_str(&separator);
    entry.push('\n');
    entry
}

/// Move `path` to `<stem>_<n>.log`, `n` one past the highest existing index
async fn rotate(path: &Path) -> io::Result<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log file has no stem"))?;

    let next = next_rotation_index(dir, stem).await?;
    let rotated = dir.join(format!("{stem}_{next}.{LOG_EXTENSION}"));
    fs::rename(path, &rotated).await?;
    Ok(rotated)
}

async fn next_rotation_index(dir: &Path, stem: &str) -> io::Result<u64> {
    let mut entries = fs::read_dir(dir).await?;
    let mut highest = 0;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(index) = entry
            .file_name()
            .to_str()
            .and_then(|name| rotation_index(name, stem))
        {
            highest = highest.max(index);
        }
    }
    highest.checked_add(1).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("rotation index for '{stem}' is exhausted"),
        )
    })
}

/// Index `n` if `name` is `<stem>_<n>.log`
fn rotation_index(name: &str, stem: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(stem)?
        .strip_prefix('_')?
        .strip_suffix(LOG_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_older_than(now: SystemTime, modified: SystemTime, max_age: Duration) -> bool {
    now.duration_since(modified)
        .map(|age| age > max_age)
        .unwrap_or(false)
}
