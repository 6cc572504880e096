//! Public token client.
//!
//! One POST mints a read-only token bound to a device. The call is not
//! idempotent: a request the server processed may already have minted a
//! token, so only requests that never reached it are resent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::ClientConfig;
use super::error::ClientError;
use crate::credentials::TokenIssuer;

/// Public token request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicTokenRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<&'a str>,
}

/// Public token response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicTokenResponse {
    success: bool,
    #[serde(default)]
    device_id: Option<String>,
    #[serde(default)]
    public_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Error body the service sends with non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A minted public token and the device it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicTokenGrant {
    /// Device identifier, assigned by the server when none was sent.
    pub device_id: String,

    /// Public access token.
    pub public_token: String,
}

impl PublicTokenResponse {
    fn into_grant(self) -> Result<PublicTokenGrant, ClientError> {
        if !self.success {
            return Err(ClientError::Denied(
                self.error
                    .unwrap_or_else(|| "public token request was rejected".to_string()),
            ));
        }

        match (self.device_id, self.public_token) {
            (Some(device_id), Some(public_token))
                if !device_id.is_empty() && !public_token.is_empty() =>
            {
                Ok(PublicTokenGrant {
                    device_id,
                    public_token,
                })
            }
            _ => Err(ClientError::MalformedResponse(
                "missing deviceId or publicToken".to_string(),
            )),
        }
    }
}

/// Reason to show for a non-success status.
fn rejection_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error
        .or(parsed.message)
        .or_else(|| Some(body.trim().to_string()).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string())
}

/// Client for the Buzzword Bingo public token endpoint.
#[derive(Debug, Clone)]
pub struct BingoApiClient {
    config: ClientConfig,
    endpoint: reqwest::Url,
    http: reqwest::Client,
}

impl BingoApiClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let endpoint = config.public_token_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(base_url))
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mints a public read token for a device.
    ///
    /// Passing the device id from an earlier grant keeps the device
    /// identity stable across tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable, rate limits past the
    /// configured wait, or refuses.
    pub async fn create_public_token(
        &self,
        device_id: Option<&str>,
    ) -> Result<PublicTokenGrant, ClientError> {
        let body = PublicTokenRequest { device_id };
        let mut resends = 0;

        loop {
            let failure = match self.send_once(&body).await {
                Ok(grant) => {
                    debug!("Public token issued for device {}", grant.device_id);
                    return Ok(grant);
                }
                Err(e) => e,
            };

            let Some(delay) = self.config.resend_delay(&failure, resends) else {
                return Err(failure);
            };
            resends += 1;
            warn!(
                "Public token request not processed ({}), resending in {:?}",
                failure, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        body: &PublicTokenRequest<'_>,
    ) -> Result<PublicTokenGrant, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs);
            return Err(ClientError::RateLimited { retry_after });
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &text),
            });
        }

        serde_json::from_str::<PublicTokenResponse>(&text)
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?
            .into_grant()
    }
}

#[async_trait]
impl TokenIssuer for BingoApiClient {
    async fn issue_public_token(
        &self,
        device_id: Option<&str>,
    ) -> Result<PublicTokenGrant, ClientError> {
        self.create_public_token(device_id).await
    }
}
