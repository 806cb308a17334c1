//! Sink implementations
//!
//! Contains ConsoleSink, FileSink, and RemoteSink.

mod console;
mod file;
mod remote;

pub use self::console::{level_style, ConsoleSink, LevelStyle};
pub use self::file::{daily_file_name, format_entry, FileSink};
pub use self::remote::{
    build_message, severity_color, tag_channel_name, RemoteSink, RemoteState, ATTRIBUTES_FIELD,
    TAG_CHANNEL_PREFIX,
};
