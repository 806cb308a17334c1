//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every `Event` carries the UTC instant it was created at
//! - Entry headers derive from that instant; file sinks pick the day from the write-time clock

mod blueprint;
mod error;
mod event;
mod filter;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use filter::SinkFilter;
pub use sink::*;
