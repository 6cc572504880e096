//! Status board configuration.
//!
//! Read from `BINGO_*` environment variables.

use std::path::PathBuf;

use bingo_sdk::{ClientConfig, PlayerSession, SubscriptionRequest, WsConfig};
use serde::{Deserialize, Serialize};

/// Realtime endpoint URL.
pub const ENV_WS_URL: &str = "BINGO_WS_URL";
/// REST API base URL.
pub const ENV_API_URL: &str = "BINGO_API_URL";
/// Game to follow.
pub const ENV_GAME_ID: &str = "BINGO_GAME_ID";
/// Optional player session token.
pub const ENV_SESSION_TOKEN: &str = "BINGO_SESSION_TOKEN";
/// Optional device id for public tokens.
pub const ENV_DEVICE_ID: &str = "BINGO_DEVICE_ID";
/// Credential cache file.
pub const ENV_STORE_PATH: &str = "BINGO_STORE_PATH";
/// Leaderboard rows to log.
pub const ENV_TOP_N: &str = "BINGO_TOP_N";

/// Configuration for the status board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Realtime WebSocket URL.
    pub ws_url: String,

    /// REST API base URL used to mint public tokens.
    pub api_url: String,

    /// Game to follow.
    pub game_id: String,

    /// Player session token; the board connects as that player when set.
    #[serde(skip_serializing)]
    pub session_token: Option<String>,

    /// Device id to mint public tokens with.
    pub device_id: Option<String>,

    /// File caching the device id and public token.
    pub store_path: PathBuf,

    /// Leaderboard rows to log.
    pub top_n: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8080/ws".to_string(),
            api_url: "http://localhost:8080/api".to_string(),
            game_id: String::new(),
            session_token: None,
            device_id: None,
            store_path: PathBuf::from(".bingo-board/credentials.json"),
            top_n: 10,
        }
    }
}

impl BoardConfig {
    /// Creates a configuration for a game.
    #[must_use]
    pub fn for_game(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            ..Default::default()
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let top_n = match get(ENV_TOP_N) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: ENV_TOP_N,
                    value: raw,
                })?,
            None => defaults.top_n,
        };

        let config = Self {
            ws_url: get(ENV_WS_URL).unwrap_or(defaults.ws_url),
            api_url: get(ENV_API_URL).unwrap_or(defaults.api_url),
            game_id: get(ENV_GAME_ID).ok_or(ConfigError::Missing(ENV_GAME_ID))?,
            session_token: get(ENV_SESSION_TOKEN),
            device_id: get(ENV_DEVICE_ID),
            store_path: get(ENV_STORE_PATH).map_or(defaults.store_path, PathBuf::from),
            top_n,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_id.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_GAME_ID));
        }

        if !self.ws_url.starts_with("ws://") && !self.ws_url.starts_with("wss://") {
            return Err(ConfigError::InvalidUrl(self.ws_url.clone()));
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.api_url.clone()));
        }

        if self.top_n == 0 {
            return Err(ConfigError::InvalidTopN);
        }

        Ok(())
    }

    /// Returns the realtime configuration.
    #[must_use]
    pub fn ws_config(&self) -> WsConfig {
        WsConfig::new(self.ws_url.clone())
    }

    /// Returns the REST client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone())
    }

    /// Returns true if the board connects as a player.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    /// Builds the subscription request for the configured game.
    #[must_use]
    pub fn subscription_request(&self) -> SubscriptionRequest {
        let request = SubscriptionRequest::game(self.game_id.clone());
        match &self.session_token {
            Some(token) => SubscriptionRequest {
                session: Some(PlayerSession::new(
                    "status-board",
                    self.game_id.clone(),
                    token.clone(),
                )),
                ..request
            },
            None => request,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is missing.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A numeric variable did not parse.
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A URL has the wrong scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Zero leaderboard rows requested.
    #[error("BINGO_TOP_N must be > 0")]
    InvalidTopN,
}
