use std::sync::Arc;

use tracing::debug;

use super::transport::{MailTransport, TransportResponse};
use super::types::{Message, MessageList, MessageRef};
use crate::credentials::CredentialManager;
use crate::error::RelayError;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Authenticated client for the Gmail list/get endpoints.
pub struct MailClient {
    user: String,
    credentials: Arc<CredentialManager>,
    transport: Arc<dyn MailTransport>,
}

impl MailClient {
    pub fn new(
        user: String,
        credentials: Arc<CredentialManager>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            user,
            credentials,
            transport,
        }
    }

    /// List message ids matching a Gmail search query, newest first.
    pub async fn list_messages(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, RelayError> {
        let url = format!(
            "{GMAIL_API_BASE}/users/{user}/messages?q={q}&maxResults={max_results}",
            user = urlencoding(&self.user),
            q = urlencoding(query),
        );

        let resp = self.fetch_with_auto_refresh(&url).await?;
        let list: MessageList = parse_json(&resp)?;
        Ok(list.messages.unwrap_or_default())
    }

    /// Fetch a full message, including its nested MIME payload.
    pub async fn get_message(&self, id: &str) -> Result<Message, RelayError> {
        let url = format!(
            "{GMAIL_API_BASE}/users/{user}/messages/{id}?format=full",
            user = urlencoding(&self.user),
            id = urlencoding(id),
        );

        let resp = self.fetch_with_auto_refresh(&url).await?;
        parse_json(&resp)
    }

    /// Issue an authenticated GET. On 401/403 the access token is force
    /// refreshed and the request retried exactly once; a second auth failure
    /// surfaces as `MailApi` rather than looping.
    async fn fetch_with_auto_refresh(&self, url: &str) -> Result<TransportResponse, RelayError> {
        let token = self.credentials.access_token(false).await?;
        let resp = self.transport.get(url, &token).await?;

        let resp = if resp.is_auth_failure() {
            debug!("Mail API returned {}; forcing token refresh and retrying", resp.status);
            let token = self.credentials.access_token(true).await?;
            self.transport.get(url, &token).await?
        } else {
            resp
        };

        if !resp.is_success() {
            return Err(RelayError::MailApi {
                status: resp.status,
                body: resp.body,
            });
        }

        Ok(resp)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(resp: &TransportResponse) -> Result<T, RelayError> {
    serde_json::from_str(&resp.body).map_err(|e| RelayError::MailApi {
        status: resp.status,
        body: format!("unparseable response: {e}"),
    })
}

fn urlencoding(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
