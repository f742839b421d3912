//! Error types for the IRC side of the bridge

use thiserror::Error;

/// Main error type for the IRC connection core
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS or service lookup produced no usable address
    #[error("Could not resolve {server}:{port}: {reason}")]
    ResolutionFailed {
        server: String,
        port: String,
        reason: String,
    },

    /// Every candidate address refused the connection
    #[error("Could not connect to {server}:{port}: {reason}")]
    ConnectFailed {
        server: String,
        port: String,
        reason: String,
    },

    /// A write returned zero or failed; the connection should be considered dead
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The channel registry could not grow
    #[error("Could not allocate channel slot: {0}")]
    AllocationFailed(String),

    /// A formatted line did not fit in the line buffer
    #[error("Line truncated from {rendered} to {capacity} bytes")]
    Truncated { rendered: usize, capacity: usize },

    #[error("Channel error: {0}")]
    Channel(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller should treat this error as a dead connection and reconnect
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Error::SendFailed(_) | Error::ConnectFailed { .. } | Error::Io(_)
        )
    }
}
