//! Public credential provider.
//!
//! Anonymous displays authenticate with a per-device public token. The
//! token is minted once through a [`TokenIssuer`] and cached in a
//! [`KeyValueStore`] so later runs skip the round trip.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::store::{KeyValueStore, StoreError};
use crate::client::{ClientError, PublicTokenGrant};

/// Store key of the cached device id.
pub const DEVICE_ID_KEY: &str = "bingo.deviceId";

/// Store key of the cached public token.
pub const PUBLIC_TOKEN_KEY: &str = "bingo.publicToken";

/// Credential provider errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The credential cache could not be read or written.
    #[error("credential storage failed: {0}")]
    Store(#[from] StoreError),

    /// The token issuer refused or could not be reached.
    #[error("token issuance failed: {0}")]
    Issuer(#[from] ClientError),
}

/// Mints public tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Requests a public token for a device.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer is unreachable or refuses.
    async fn issue_public_token(
        &self,
        device_id: Option<&str>,
    ) -> Result<PublicTokenGrant, ClientError>;
}

/// Supplies the public credential used when no session token exists.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the cached public token, minting one if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is cached and none can be minted.
    async fn get_or_create(&self, device_id: Option<&str>) -> Result<String, CredentialError>;
}

/// Store-backed provider that mints through a token issuer.
#[derive(Debug)]
pub struct PublicCredentialProvider<S, I> {
    store: S,
    issuer: I,
    mint_lock: Mutex<()>,
}

impl<S: KeyValueStore, I: TokenIssuer> PublicCredentialProvider<S, I> {
    /// Creates a provider.
    #[must_use]
    pub fn new(store: S, issuer: I) -> Self {
        Self {
            store,
            issuer,
            mint_lock: Mutex::new(()),
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the cached device id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn device_id(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.store.get(DEVICE_ID_KEY)?)
    }

    /// Forgets the cached token. The device id is kept so the next mint
    /// reuses it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn invalidate(&self) -> Result<(), CredentialError> {
        self.store.remove(PUBLIC_TOKEN_KEY)?;
        debug!("Cached public token invalidated");
        Ok(())
    }

    fn cached_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self
            .store
            .get(PUBLIC_TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }
}

#[async_trait]
impl<S: KeyValueStore, I: TokenIssuer> CredentialProvider for PublicCredentialProvider<S, I> {
    async fn get_or_create(&self, device_id: Option<&str>) -> Result<String, CredentialError> {
        if let Some(token) = self.cached_token()? {
            return Ok(token);
        }

        let _guard = self.mint_lock.lock().await;

        // Another caller may have minted while we waited.
        if let Some(token) = self.cached_token()? {
            return Ok(token);
        }

        let device = match device_id {
            Some(id) => Some(id.to_string()),
            None => self.store.get(DEVICE_ID_KEY)?,
        };

        let grant = self.issuer.issue_public_token(device.as_deref()).await?;
        self.store.set(DEVICE_ID_KEY, &grant.device_id)?;
        self.store.set(PUBLIC_TOKEN_KEY, &grant.public_token)?;

        info!("Minted public token for device {}", grant.device_id);
        Ok(grant.public_token)
    }
}
