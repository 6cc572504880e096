//! Access credential types.

use std::fmt;

/// Number of token characters that identify a credential in a pool key.
pub const CREDENTIAL_PREFIX_LEN: usize = 16;

/// Kind of access a credential grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Per-player signed session token.
    User,
    /// Per-device anonymous read token.
    Public,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Public => write!(f, "public"),
        }
    }
}

/// Opaque access credential appended to the realtime URL.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    /// Signed token of an authenticated player session.
    Session(String),
    /// Public per-device token for anonymous displays.
    Public(String),
}

impl Credential {
    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Session(token) | Self::Public(token) => token,
        }
    }

    /// Returns the credential kind.
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::Session(_) => CredentialKind::User,
            Self::Public(_) => CredentialKind::Public,
        }
    }

    /// Returns the leading characters used to tell credentials apart.
    #[must_use]
    pub fn prefix(&self) -> &str {
        let token = self.token();
        match token.char_indices().nth(CREDENTIAL_PREFIX_LEN) {
            Some((end, _)) => token.get(..end).unwrap_or(token),
            None => token,
        }
    }

    /// Returns true if the token is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token().trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.token().chars().take(4).collect();
        match self {
            Self::Session(_) => write!(f, "Credential::Session({}…)", shown),
            Self::Public(_) => write!(f, "Credential::Public({}…)", shown),
        }
    }
}
