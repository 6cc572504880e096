//! WebSocket configuration.
//!
//! Provides configuration options for the realtime connection pool and the
//! subscriptions built on top of it.

use std::time::Duration;

use super::error::WsError;
use crate::types::DEFAULT_FEED_CAPACITY;

/// Default realtime WebSocket URL.
pub const DEFAULT_WS_URL: &str = "wss://realtime.buzzword-bingo.example/ws";

/// Default query parameter carrying the access credential.
pub const DEFAULT_TOKEN_PARAM: &str = "token";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default reconnect delay in seconds.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 1;

/// Maximum reconnect delay in seconds.
pub const MAX_RECONNECT_DELAY_SECS: u64 = 30;

/// Default maximum reconnection attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// WebSocket configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL.
    pub url: String,

    /// Query parameter name used to pass the credential.
    pub token_param: String,

    /// Heartbeat interval. Zero disables pings.
    pub heartbeat_interval: Duration,

    /// Time allowed for the socket to reach the open state.
    pub connect_timeout: Duration,

    /// Initial reconnect delay.
    pub reconnect_delay: Duration,

    /// Maximum reconnect delay.
    pub max_reconnect_delay: Duration,

    /// Maximum consecutive reconnection attempts.
    pub max_reconnect_attempts: u32,

    /// Number of activity events kept per subscription.
    pub feed_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            token_param: DEFAULT_TOKEN_PARAM.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            max_reconnect_delay: Duration::from_secs(MAX_RECONNECT_DELAY_SECS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the credential query parameter name.
    #[must_use]
    pub fn with_token_param(mut self, param: impl Into<String>) -> Self {
        self.token_param = param.into();
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the initial reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the maximum reconnect delay.
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the activity feed capacity.
    #[must_use]
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Returns the connection URL carrying the given credential.
    ///
    /// The token is form-encoded, so opaque tokens with `+`, `/`, `=` or
    /// `&` reach the server intact.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::InvalidConfig`] if the base URL does not parse.
    pub fn connection_url(&self, token: &str) -> Result<String, WsError> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| WsError::InvalidConfig(format!("invalid url {:?}: {}", self.url, e)))?;
        url.query_pairs_mut().append_pair(&self.token_param, token);
        Ok(url.into())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.url.is_empty() {
            return Err(WsError::InvalidConfig(
                "url cannot be empty".to_string(),
            ));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(WsError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        reqwest::Url::parse(&self.url)
            .map_err(|e| WsError::InvalidConfig(format!("invalid url {:?}: {}", self.url, e)))?;

        if self.token_param.is_empty() {
            return Err(WsError::InvalidConfig(
                "token_param cannot be empty".to_string(),
            ));
        }

        if self.reconnect_delay > self.max_reconnect_delay {
            return Err(WsError::InvalidConfig(
                "reconnect_delay must be <= max_reconnect_delay".to_string(),
            ));
        }

        if self.feed_capacity == 0 {
            return Err(WsError::InvalidConfig(
                "feed_capacity must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
