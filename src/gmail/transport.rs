use async_trait::async_trait;
use std::time::Duration;

use crate::error::RelayError;

/// Bounded timeout for all mail API calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw response from the mail provider, before any status handling.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Transport seam for authenticated GETs against the mail API.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn get(&self, url: &str, access_token: &str) -> Result<TransportResponse, RelayError>;
}

/// reqwest-backed transport used in production.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for HttpTransport {
    async fn get(&self, url: &str, access_token: &str) -> Result<TransportResponse, RelayError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        Ok(TransportResponse { status, body })
    }
}
