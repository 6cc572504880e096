//! HTTP client for the Buzzword Bingo REST API.
//!
//! The realtime core uses it as the token-issuing collaborator: anonymous
//! status boards mint a per-device public token once and cache it.
//!
//! # Example
//!
//! ```rust,ignore
//! use bingo_sdk::client::BingoApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BingoApiClient::with_base_url("https://api.buzzword-bingo.example")?;
//!
//!     let grant = client.create_public_token(None).await?;
//!     println!("device {} got a public token", grant.device_id);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{BingoApiClient, PublicTokenGrant};
