//! Token client errors.

use std::time::Duration;

/// Errors from a public token request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request never reached the token service.
    #[error("token service unreachable: {0}")]
    Unreachable(String),

    /// No response arrived in time. The server may still have minted a
    /// token.
    #[error("token request timed out")]
    Timeout,

    /// The request failed after it was sent.
    #[error("token request failed: {0}")]
    Transport(String),

    /// The service asked the caller to slow down.
    #[error("token request rate limited")]
    RateLimited {
        /// Wait requested through `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The service answered with a non-success status.
    #[error("token request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason given by the service.
        message: String,
    },

    /// The service answered but refused to issue a token.
    #[error("public token denied: {0}")]
    Denied(String),

    /// The response body was not a usable grant.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    /// Returns true if the service cannot have acted on the request, so
    /// sending it again cannot mint a second token.
    #[must_use]
    pub fn is_unprocessed(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::RateLimited { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unreachable(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}
