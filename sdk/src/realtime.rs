//! Realtime service.
//!
//! [`BingoRealtime`] is the explicit, application-owned home of the shared
//! connection pool and the public credential provider. Create it once at
//! startup, hand out subscriptions from it, and call
//! [`BingoRealtime::shutdown`] on exit.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::client::{BingoApiClient, ClientConfig};
use crate::credentials::{CredentialProvider, KeyValueStore, PublicCredentialProvider};
use crate::error::SdkError;
use crate::ws::{ConnectionPool, CredentialSource, LeaderboardSubscription, WsConfig};

/// An authenticated player's session.
#[derive(Clone, PartialEq, Eq)]
pub struct PlayerSession {
    /// Player session identifier.
    pub session_id: String,

    /// Game the session belongs to.
    pub game_id: String,

    /// Per-session signed token.
    pub token: String,
}

impl fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerSession")
            .field("session_id", &self.session_id)
            .field("game_id", &self.game_id)
            .field("token", &"..")
            .finish()
    }
}

impl PlayerSession {
    /// Creates a session.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        game_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            game_id: game_id.into(),
            token: token.into(),
        }
    }
}

/// What a consumer wants to follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRequest {
    /// Explicit game id; takes precedence over the session's.
    pub game_id: Option<String>,

    /// Player session, for an authenticated connection.
    pub session: Option<PlayerSession>,
}

impl SubscriptionRequest {
    /// Anonymous request for a game.
    #[must_use]
    pub fn game(game_id: impl Into<String>) -> Self {
        Self {
            game_id: Some(game_id.into()),
            session: None,
        }
    }

    /// Authenticated request for the session's game.
    #[must_use]
    pub fn session(session: PlayerSession) -> Self {
        Self {
            game_id: None,
            session: Some(session),
        }
    }

    /// Sets an explicit game id.
    #[must_use]
    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Returns the game to follow, if one can be resolved.
    #[must_use]
    pub fn resolved_game_id(&self) -> Option<&str> {
        self.game_id
            .as_deref()
            .or_else(|| self.session.as_ref().map(|s| s.game_id.as_str()))
            .filter(|id| !id.is_empty())
    }

    fn session_token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .map(|s| s.token.as_str())
            .filter(|token| !token.is_empty())
    }
}

/// Shared realtime service.
#[derive(Clone)]
pub struct BingoRealtime {
    pool: ConnectionPool,
    credentials: Arc<dyn CredentialProvider>,
    device_id: Option<String>,
}

impl fmt::Debug for BingoRealtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BingoRealtime")
            .field("pool", &self.pool)
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl BingoRealtime {
    /// Creates the service from a pool and a public credential provider.
    #[must_use]
    pub fn new(pool: ConnectionPool, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            pool,
            credentials,
            device_id: None,
        }
    }

    /// Creates the service over real sockets, minting public tokens through
    /// the REST API and caching them in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid.
    pub fn connect<S>(
        ws_config: WsConfig,
        client_config: ClientConfig,
        store: S,
    ) -> Result<Self, SdkError>
    where
        S: KeyValueStore + 'static,
    {
        let pool = ConnectionPool::with_tungstenite(ws_config)?;
        let issuer = BingoApiClient::new(client_config)?;
        let provider = PublicCredentialProvider::new(store, issuer);
        Ok(Self::new(pool, Arc::new(provider)))
    }

    /// Sets the device id used when minting public tokens.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Returns the shared pool.
    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Starts a subscription.
    ///
    /// A session token opens a user connection; otherwise a public token is
    /// used. Without a resolvable game id the subscription stays idle.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn subscribe(&self, request: SubscriptionRequest) -> LeaderboardSubscription {
        let source = match request.session_token() {
            Some(token) => CredentialSource::Session(token.to_string()),
            None => CredentialSource::Public {
                provider: Arc::clone(&self.credentials),
                device_id: self.device_id.clone(),
            },
        };

        LeaderboardSubscription::start(
            self.pool.clone(),
            request.resolved_game_id().map(String::from),
            source,
        )
    }

    /// Closes every socket. Live subscriptions end in the idle phase.
    pub fn shutdown(&self) {
        info!("Shutting down realtime service");
        self.pool.shutdown();
    }
}
