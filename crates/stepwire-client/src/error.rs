//! Semantic error types for the exchange client.
//!
//! Connection failures are split into an initialization class, meaning the
//! companion process is not reachable yet, and a transport class covering
//! everything that goes wrong once a channel exists. Only the former is
//! recovered from, and only by the context-resolving calls on
//! [`crate::client::StepClient`].

use thiserror::Error;

use crate::messages::MessageType;

/// Errors raised while obtaining or using a [`crate::connection::Connection`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The companion process could not be reached on its port.
    #[error("companion process on port {port} is not reachable: {source}")]
    Initialization {
        /// Port the connection was attempted on.
        port: u16,
        /// Underlying connect failure.
        source: std::io::Error,
    },

    /// No companion process is known for the requested project.
    #[error("no companion process registered for project '{0}'")]
    NotRegistered(String),

    /// Reading or writing the channel failed mid-exchange.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An envelope could not be encoded or decoded.
    #[error("malformed envelope: {0}")]
    Codec(#[from] serde_json::Error),

    /// The companion closed the channel before replying.
    #[error("companion closed the connection before replying")]
    Closed,

    /// An earlier exchange failed, leaving the channel out of step with the
    /// companion.
    #[error("connection abandoned after an earlier failed exchange")]
    Broken,

    /// A caller panicked while holding a shared connection.
    #[error("shared connection poisoned by a panicked caller")]
    Poisoned,
}

impl ConnectionError {
    /// Whether this failure means the companion is not ready yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepwire_client::error::ConnectionError;
    ///
    /// assert!(ConnectionError::NotRegistered("shop".into()).is_initialization());
    /// assert!(!ConnectionError::Closed.is_initialization());
    /// ```
    #[must_use]
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. } | Self::NotRegistered(_))
    }
}

/// Errors surfaced by the exchange client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection could not be obtained or failed during the exchange.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The companion answered with a response for a different request.
    #[error("expected {expected} but companion replied with {actual}")]
    UnexpectedResponse {
        /// Response variant paired with the request.
        expected: MessageType,
        /// Variant actually received.
        actual: MessageType,
    },

    /// The companion reported that it could not serve the request.
    #[error("companion reported an error: {0}")]
    Companion(String),

    /// An invalid configuration value was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Whether this error wraps a connection-initialization failure.
    #[must_use]
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Connection(err) if err.is_initialization())
    }
}
