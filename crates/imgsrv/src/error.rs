//! Error types for the request server.

use thiserror::Error;

/// Errors that can occur while serving a connection.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A socket `read`/`send` returned a non-positive result.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The bounded queue was full at admission time.
    #[error("queue is full")]
    QueueFull,

    /// The wire header carried an opcode this server does not recognize.
    #[error("invalid operation code: {0}")]
    InvalidOp(u8),

    /// A request targeted an image ID beyond the store's current length.
    #[error("invalid image id: {0}")]
    InvalidImageId(u64),

    /// Command-line arguments were missing or malformed.
    #[error("usage error: {0}")]
    UsageError(String),
}

impl ServerError {
    /// `true` for errors that are reported back to the client as a rejection
    /// rather than tearing down the connection.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::QueueFull | Self::InvalidOp(_) | Self::InvalidImageId(_)
        )
    }

    /// `true` for errors that end the connection handler's read loop.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}
