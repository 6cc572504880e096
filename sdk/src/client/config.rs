//! Token client configuration.

use std::time::Duration;

use super::error::ClientError;

/// Path of the public token endpoint, relative to the API base URL.
pub const PUBLIC_TOKEN_PATH: &str = "/public-token";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of resends for requests the service never processed.
pub const DEFAULT_RESEND_LIMIT: u32 = 2;

/// Default delay before the first resend of an unreachable request.
pub const DEFAULT_RESEND_BACKOFF: Duration = Duration::from_millis(250);

/// Default longest `Retry-After` the client is willing to sleep through.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Configuration of the public token client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://bingo.example/api`.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Resends allowed for requests the service never processed.
    pub resend_limit: u32,

    /// Delay before the first resend of an unreachable request; doubles
    /// per resend.
    pub resend_backoff: Duration,

    /// Longest `Retry-After` honoured before giving up.
    pub max_rate_limit_wait: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the API at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            resend_limit: DEFAULT_RESEND_LIMIT,
            resend_backoff: DEFAULT_RESEND_BACKOFF,
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
            user_agent: format!("bingo-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how often an unprocessed request may be resent.
    #[must_use]
    pub fn with_resend_limit(mut self, limit: u32) -> Self {
        self.resend_limit = limit;
        self
    }

    /// Sets the first resend delay.
    #[must_use]
    pub fn with_resend_backoff(mut self, backoff: Duration) -> Self {
        self.resend_backoff = backoff;
        self
    }

    /// Sets the longest honoured `Retry-After`.
    #[must_use]
    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the public token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the base URL does not parse.
    pub fn public_token_url(&self) -> Result<reqwest::Url, ClientError> {
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), PUBLIC_TOKEN_PATH);
        reqwest::Url::parse(&joined)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid base_url {:?}: {}", self.base_url, e)))
    }

    /// Returns how long to wait before resending after `failure`, or
    /// `None` if the request must not be sent again.
    ///
    /// `resends` is the number of resends already made. Only failures the
    /// service never processed are resent, so a retry cannot mint a second
    /// token for the same device.
    #[must_use]
    pub fn resend_delay(&self, failure: &ClientError, resends: u32) -> Option<Duration> {
        if resends >= self.resend_limit || !failure.is_unprocessed() {
            return None;
        }

        match failure {
            ClientError::RateLimited { retry_after } => {
                let wait = retry_after.unwrap_or(self.resend_backoff);
                (wait <= self.max_rate_limit_wait).then_some(wait)
            }
            _ => Some(
                self.resend_backoff
                    .saturating_mul(2u32.saturating_pow(resends)),
            ),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::InvalidConfig(
                "base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "timeout must be > 0".to_string(),
            ));
        }

        self.public_token_url().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("https://bingo.example/api")
            .with_resend_backoff(Duration::from_millis(100))
    }

    #[test]
    fn test_config_new() {
        let config = ClientConfig::new("https://bingo.example/api");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.resend_limit, DEFAULT_RESEND_LIMIT);
        assert!(config.user_agent.starts_with("bingo-sdk/"));
    }

    #[test]
    fn test_public_token_url() {
        let url = ClientConfig::new("https://bingo.example/api/")
            .public_token_url()
            .expect("url");
        assert_eq!(url.as_str(), "https://bingo.example/api/public-token");
    }

    #[test]
    fn test_config_validate() {
        assert!(config().validate().is_ok());
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("ftp://bingo.example").validate().is_err());
        assert!(ClientConfig::new("http://bad host/api").validate().is_err());
        assert!(config().with_timeout(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_unreachable_resends_back_off() {
        let failure = ClientError::Unreachable("connection refused".to_string());
        let config = config();
        assert_eq!(config.resend_delay(&failure, 0), Some(Duration::from_millis(100)));
        assert_eq!(config.resend_delay(&failure, 1), Some(Duration::from_millis(200)));
        assert_eq!(config.resend_delay(&failure, 2), None);
    }

    #[test]
    fn test_rate_limit_honours_retry_after_up_to_cap() {
        let config = config().with_max_rate_limit_wait(Duration::from_secs(2));

        let short = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(1)),
        };
        assert_eq!(config.resend_delay(&short, 0), Some(Duration::from_secs(1)));

        let unspecified = ClientError::RateLimited { retry_after: None };
        assert_eq!(
            config.resend_delay(&unspecified, 0),
            Some(Duration::from_millis(100))
        );

        let long = ClientError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        };
        assert_eq!(config.resend_delay(&long, 0), None);
    }

    #[test]
    fn test_processed_failures_are_never_resent() {
        let config = config();
        assert_eq!(config.resend_delay(&ClientError::Timeout, 0), None);
        let rejected = ClientError::Rejected {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(config.resend_delay(&rejected, 0), None);
        assert_eq!(
            config.resend_delay(&ClientError::Denied("disabled".to_string()), 0),
            None
        );
    }

    #[test]
    fn test_zero_resend_limit_disables_resends() {
        let config = config().with_resend_limit(0);
        let failure = ClientError::Unreachable("connection refused".to_string());
        assert_eq!(config.resend_delay(&failure, 0), None);
    }
}
