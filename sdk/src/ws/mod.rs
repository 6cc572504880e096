//! Realtime leaderboard streaming.
//!
//! A process-wide [`ConnectionPool`] keeps at most one WebSocket per game
//! and credential and fans frames out to every [`LeaderboardSubscription`]
//! following that game.
//!
//! # Example
//!
//! ```rust,ignore
//! use bingo_sdk::ws::{ConnectionPool, CredentialSource, LeaderboardSubscription, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = ConnectionPool::with_tungstenite(WsConfig::new("wss://bingo.example/ws"))?;
//!
//!     let subscription = LeaderboardSubscription::start(
//!         pool.clone(),
//!         Some("g1".to_string()),
//!         CredentialSource::Session(session_token),
//!     );
//!
//!     let mut updates = subscription.watch();
//!     while updates.changed().await.is_ok() {
//!         let state = updates.borrow().clone();
//!         println!("{:?}", state.leaderboard);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod pool;
pub mod reconnect;
pub mod subscription;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::WsConfig;
pub use error::WsError;
pub use messages::{is_abnormal_closure, ClientMessage, InboundFrame, NORMAL_CLOSURE};
pub use metrics::PoolMetrics;
pub use pool::{
    next_subscriber_id, ConnectionKey, ConnectionPool, FrameCallback, PooledConnection,
    SubscriberId,
};
pub use reconnect::{ConnectionPhase, ReconnectPolicy, ReconnectState, RetryDecision};
pub use subscription::{CredentialSource, LeaderboardSubscription, SubscriptionState};
pub use transport::{
    Connector, TransportCommand, TransportEvent, TransportHandle, TungsteniteConnector,
};
