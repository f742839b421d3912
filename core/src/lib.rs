//! toxirc IRC core
//!
//! Connection, channel and session management for the IRC side of the
//! toxirc bridge: connect and register with a server, keep track of the
//! channels the bridge is in, relay messages as newline-terminated lines,
//! and rejoin every channel after a reconnect.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod registry;
pub mod resolve;
pub mod sender;
pub mod session;
pub mod utils;

#[cfg(test)]
mod tests;

pub use backoff::Backoff;
pub use config::{BotConfig, IrcConfig, Settings};
pub use connection::{read_line, ConnectionManager, ConnectionState, ConnectionStats, LineReader};
pub use error::{Error, Result};
pub use message::Command;
pub use registry::{ChannelMembership, ChannelRegistry};
pub use sender::{send, send_fmt, SendReport, LINE_CAPACITY};
pub use session::Session;

/// Re-exports for convenience
pub use tracing::{debug, error, info, warn};
