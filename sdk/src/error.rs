//! SDK error types.
//!
//! Provides the top-level error returned when assembling the realtime
//! service from its parts.

use crate::client::ClientError;
use crate::credentials::{CredentialError, StoreError};
use crate::ws::WsError;

/// SDK errors.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Realtime configuration or connection error.
    #[error("realtime error: {0}")]
    Ws(#[from] WsError),

    /// HTTP client error.
    #[error("http client error: {0}")]
    Client(#[from] ClientError),

    /// Credential provider error.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Credential store error.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}
