//! WebSocket error types.
//!
//! Provides error types for the realtime connection pool and subscriptions.

use std::fmt;

/// WebSocket errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// No credential could be obtained for the connection.
    NoCredential(String),

    /// Connection failed before reaching the open state.
    Connection(String),

    /// Failed to serialize message.
    Serialization(String),

    /// Connection closed.
    Closed,

    /// Reconnection attempts exhausted.
    ReconnectExhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Invalid configuration.
    InvalidConfig(String),

    /// Send failed.
    SendFailed(String),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredential(msg) => write!(f, "no credential available: {}", msg),
            Self::Connection(msg) => write!(f, "connection failed: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::Closed => write!(f, "connection closed"),
            Self::ReconnectExhausted { attempts } => {
                write!(f, "connection lost after {} reconnect attempts", attempts)
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}
