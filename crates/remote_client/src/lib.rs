//! # Remote Client
//!
//! Chat platform access for the remote sink.
//!
//! Responsibilities:
//! - Define the `RemoteConnection` / `Guild` / `Channel` abstraction
//! - Model embed messages
//! - Provide an in-memory mock connection for tests
//! - Provide a REST connection for Discord-compatible APIs
//!
//! ## Feature Flags
//!
//! - `rest`: Enable the HTTP connection (requires reqwest)

pub mod client;
pub mod error;
pub mod message;
pub mod mock_client;

#[cfg(feature = "rest")]
pub mod rest_client;

pub use client::{Channel, Guild, RemoteConnection};
pub use error::{RemoteError, Result};
pub use message::{Embed, EmbedField, EmbedFooter, FIELD_VALUE_LIMIT, Message};
pub use mock_client::{Delivery, MockConfig, MockConnection};

#[cfg(feature = "rest")]
pub use rest_client::{RestConfig, RestConnection};
