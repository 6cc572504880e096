//! Credentials for the realtime endpoint.
//!
//! Two kinds exist: a per-session signed token for authenticated players,
//! and a per-device public token for anonymous status boards. Both are
//! opaque strings to the SDK.

pub mod credential;
pub mod provider;
pub mod store;

pub use credential::{Credential, CredentialKind, CREDENTIAL_PREFIX_LEN};
pub use provider::{
    CredentialError, CredentialProvider, PublicCredentialProvider, TokenIssuer, DEVICE_ID_KEY,
    PUBLIC_TOKEN_KEY,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
