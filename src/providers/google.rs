use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::traits::{TokenEndpoint, TokenGrant};
use crate::error::RelayError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Bounded timeout for all token-endpoint calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Google OAuth 2.0 token endpoint.
///
/// Token lifetime: 1 hour. Refresh requires the consent flow to have run with
/// `access_type=offline` and `prompt=consent`, otherwise Google withholds the
/// refresh token.
pub struct GoogleTokenEndpoint {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

// Raw token response from Google's token endpoint
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

// Error payload shape: {"error": "...", "error_description": "..."}
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: Option<String>,
    #[allow(dead_code)]
    error_description: Option<String>,
}

impl GoogleTokenEndpoint {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn grant(&self, form: &[(&str, &str)]) -> Result<TokenGrant, RelayError> {
        let resp = self.http.post(TOKEN_URL).form(form).send().await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(classify_grant_error(status, body));
        }

        let token: GoogleTokenResponse = serde_json::from_str(&body).map_err(|e| {
            RelayError::TokenEndpoint {
                status,
                body: format!("unparseable token response: {e}"),
            }
        })?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            scope: token.scope,
        })
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, RelayError> {
        self.grant(&[
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RelayError> {
        self.grant(&[
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    fn auth_url(&self, redirect_uri: &str) -> String {
        format!(
            "{AUTH_URL}?\
             client_id={client_id}\
             &redirect_uri={redirect_uri}\
             &response_type=code\
             &scope={scope}\
             &access_type=offline\
             &prompt=consent",
            client_id = urlencoding(&self.client_id),
            redirect_uri = urlencoding(redirect_uri),
            scope = urlencoding(SCOPE),
        )
    }
}

/// Map a non-2xx token-endpoint response to the error taxonomy.
///
/// `invalid_grant` means the refresh token was revoked or expired and the
/// operator must redo the interactive flow; everything else is surfaced with
/// status and payload for diagnostics.
fn classify_grant_error(status: u16, body: String) -> RelayError {
    if let Ok(err) = serde_json::from_str::<GoogleErrorResponse>(&body) {
        if err.error.as_deref() == Some("invalid_grant") {
            return RelayError::RevokedCredential;
        }
    }
    RelayError::TokenEndpoint { status, body }
}

/// Simple percent-encoding for URL parameters.
fn urlencoding(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
