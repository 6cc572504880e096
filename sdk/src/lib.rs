//! Buzzword Bingo SDK - realtime client core.
//!
//! This crate keeps live leaderboards, activity feeds and game state in
//! sync with the Buzzword Bingo realtime endpoint. Any number of consumers
//! following the same game with the same credential share one WebSocket.
//!
//! # Building Blocks
//!
//! - [`ConnectionPool`] - One socket per game and credential, frame fan-out
//! - [`LeaderboardSubscription`] - A consumer's reactive view with reconnect
//! - [`BingoRealtime`] - Service object owning the pool and credentials
//! - [`PublicCredentialProvider`] - Cached per-device public tokens
//!
//! # Data Types
//!
//! - [`LeaderboardSnapshot`] - Ranked leaderboard at a point in time
//! - [`ActivityFeed`] - Newest-first bounded activity events
//! - [`WinnerInfo`] - The player who won
//!
//! # Example
//!
//! ```rust,ignore
//! use bingo_sdk::{BingoRealtime, ClientConfig, FileStore, SubscriptionRequest, WsConfig};
//!
//! let realtime = BingoRealtime::connect(
//!     WsConfig::new("wss://bingo.example/ws"),
//!     ClientConfig::new("https://bingo.example/api"),
//!     FileStore::open("credentials.json")?,
//! )?;
//!
//! let subscription = realtime.subscribe(SubscriptionRequest::game("g1"));
//! let state = subscription.state();
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod realtime;
pub mod types;
pub mod ws;

pub use client::{BingoApiClient, ClientConfig, ClientError};
pub use credentials::{
    Credential, CredentialKind, CredentialProvider, FileStore, KeyValueStore, MemoryStore,
    PublicCredentialProvider,
};
pub use error::SdkError;
pub use realtime::{BingoRealtime, PlayerSession, SubscriptionRequest};
pub use types::{ActivityEvent, ActivityFeed, LeaderboardEntry, LeaderboardSnapshot, WinnerInfo};
pub use ws::{
    ConnectionPhase, ConnectionPool, LeaderboardSubscription, SubscriptionState, WsConfig,
    WsError,
};
