use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Tokens returned from the provider after a code exchange or refresh grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// OAuth2 token endpoint operations the relay depends on.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for an access token (and, with
    /// `access_type=offline`, a refresh token). One-shot; used only during
    /// the interactive connect flow.
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<TokenGrant, RelayError>;

    /// Mint a fresh access token from a refresh token.
    ///
    /// An `invalid_grant` response must surface as
    /// [`RelayError::RevokedCredential`] so callers never retry it blindly.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RelayError>;

    /// Build the consent URL the operator is sent to when (re-)connecting.
    fn auth_url(&self, redirect_uri: &str) -> String;
}
