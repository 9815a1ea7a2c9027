//! Credential manager: the OAuth access-token lifecycle for one mailbox.
//!
//! Holds the in-process token cache, refreshes against the provider's token
//! endpoint when the cached token is absent, expiring, or rejected, and
//! persists renewals back to the token store. Refreshes are single-flight:
//! the cache mutex is held across the grant call, so concurrent callers
//! await the same refresh instead of racing the provider.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::providers::{TokenEndpoint, TokenGrant};
use crate::store::{CredentialRecord, TokenStore};

/// Buffer subtracted from token expiry so a token is never used mid-flight
/// of its expiry.
const SAFETY_WINDOW_MS: i64 = 60_000;

/// Process-lifetime token cache, lazily seeded from the credential record.
#[derive(Debug, Clone)]
struct TokenCache {
    access_token: Option<String>,
    /// Epoch milliseconds.
    expires_at: Option<i64>,
    refresh_token: String,
}

impl TokenCache {
    /// A cached access token counts as valid only while it is outside the
    /// safety window of its expiry.
    fn valid_access_token(&self, now_ms: i64) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        let expires_at = self.expires_at?;
        if expires_at - SAFETY_WINDOW_MS > now_ms {
            Some(token)
        } else {
            None
        }
    }
}

pub struct CredentialManager {
    record_id: String,
    /// Static refresh-token fallback from the environment.
    fallback_refresh_token: Option<String>,
    endpoint: Arc<dyn TokenEndpoint>,
    store: Arc<TokenStore>,
    cache: Mutex<Option<TokenCache>>,
}

impl CredentialManager {
    pub fn new(
        record_id: String,
        fallback_refresh_token: Option<String>,
        endpoint: Arc<dyn TokenEndpoint>,
        store: Arc<TokenStore>,
    ) -> Self {
        Self {
            record_id,
            fallback_refresh_token,
            endpoint,
            store,
            cache: Mutex::new(None),
        }
    }

    /// Get a usable access token, refreshing if needed.
    ///
    /// With `force_refresh` false the cached token is returned as long as it
    /// is outside the safety window; otherwise a refresh-token grant runs and
    /// the renewed token is cached and persisted. Persistence failures are
    /// logged, not fatal: the in-memory token is still usable this cycle.
    pub async fn access_token(&self, force_refresh: bool) -> Result<String, RelayError> {
        let mut cache = self.cache.lock().await;

        if cache.is_none() {
            *cache = self.load_from_store().await;
        }

        if !force_refresh {
            if let Some(c) = cache.as_ref() {
                if let Some(token) = c.valid_access_token(Utc::now().timestamp_millis()) {
                    return Ok(token.to_string());
                }
            }
        }

        let refresh_token = self.resolve_refresh_token(cache.as_ref()).await?;
        let grant = self.endpoint.refresh(&refresh_token).await?;

        let renewed = self.apply_grant(grant, Some(refresh_token));
        let access_token = renewed
            .access_token
            .clone()
            .ok_or_else(|| RelayError::Internal("refresh grant carried no access token".into()))?;

        self.persist(&renewed).await;
        *cache = Some(renewed);

        Ok(access_token)
    }

    /// Seed the cache and store from a fresh interactive code exchange,
    /// overwriting whatever was there.
    pub async fn install(&self, grant: TokenGrant) -> Result<CredentialRecord, RelayError> {
        let mut cache = self.cache.lock().await;

        let refresh_token = grant
            .refresh_token
            .clone()
            .or_else(|| self.fallback_refresh_token.clone())
            .ok_or(RelayError::MissingCredential)?;

        let seeded = TokenCache {
            access_token: Some(grant.access_token),
            expires_at: grant
                .expires_in
                .map(|secs| Utc::now().timestamp_millis() + secs as i64 * 1000),
            refresh_token,
        };

        let record = self.to_record(&seeded);
        self.persist(&seeded).await;
        *cache = Some(seeded);

        Ok(record)
    }

    /// Resolve a refresh token by priority: in-memory cache, environment
    /// fallback, then the stored credential record.
    async fn resolve_refresh_token(&self, cache: Option<&TokenCache>) -> Result<String, RelayError> {
        if let Some(c) = cache {
            if !c.refresh_token.is_empty() {
                return Ok(c.refresh_token.clone());
            }
        }

        if let Some(rt) = &self.fallback_refresh_token {
            return Ok(rt.clone());
        }

        if let Some(cached) = self.load_from_store().await {
            return Ok(cached.refresh_token);
        }

        Err(RelayError::MissingCredential)
    }

    /// Build the renewed cache entry from a refresh grant. Rotation is rare
    /// but must be honored: a grant carrying a new refresh token replaces the
    /// old one, which the provider may have just invalidated.
    fn apply_grant(&self, grant: TokenGrant, previous_refresh: Option<String>) -> TokenCache {
        let refresh_token = grant
            .refresh_token
            .or(previous_refresh)
            .or_else(|| self.fallback_refresh_token.clone())
            .unwrap_or_default();

        TokenCache {
            access_token: Some(grant.access_token),
            expires_at: grant
                .expires_in
                .map(|secs| Utc::now().timestamp_millis() + secs as i64 * 1000),
            refresh_token,
        }
    }

    async fn load_from_store(&self) -> Option<TokenCache> {
        let record = match self.store.get(&self.record_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Token store read failed ({e}); treating as no stored credential");
                None
            }
        }?;

        let refresh_token = record.refresh_token?;
        Some(TokenCache {
            access_token: record.access_token,
            expires_at: record.expires_at,
            refresh_token,
        })
    }

    async fn persist(&self, cache: &TokenCache) {
        let record = self.to_record(cache);
        match self.store.upsert(&record).await {
            Ok(()) => info!("Credential record '{}' saved", self.record_id),
            Err(e) => warn!("Failed to persist credential record: {e}"),
        }
    }

    fn to_record(&self, cache: &TokenCache) -> CredentialRecord {
        CredentialRecord {
            id: self.record_id.clone(),
            access_token: cache.access_token.clone(),
            refresh_token: Some(cache.refresh_token.clone()),
            expires_at: cache.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Endpoint stub that counts refresh calls and records the refresh token
    /// each grant was issued with.
    struct StubEndpoint {
        refresh_calls: AtomicUsize,
        last_refresh_token: StdMutex<Option<String>>,
        rotate_to: Option<String>,
        fail_with_revoked: bool,
    }

    impl StubEndpoint {
        fn new() -> Self {
            Self {
                refresh_calls: AtomicUsize::new(0),
                last_refresh_token: StdMutex::new(None),
                rotate_to: None,
                fail_with_revoked: false,
            }
        }

        fn rotating(new_refresh: &str) -> Self {
            Self {
                rotate_to: Some(new_refresh.into()),
                ..Self::new()
            }
        }

        fn revoked() -> Self {
            Self {
                fail_with_revoked: true,
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenEndpoint for StubEndpoint {
        async fn exchange_code(
            &self,
            _code: &str,
            _redirect_uri: &str,
        ) -> Result<TokenGrant, RelayError> {
            unreachable!("exchange_code not used in these tests")
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, RelayError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_refresh_token.lock().unwrap() = Some(refresh_token.to_string());

            if self.fail_with_revoked {
                return Err(RelayError::RevokedCredential);
            }

            Ok(TokenGrant {
                access_token: format!("access-{}", self.calls()),
                refresh_token: self.rotate_to.clone(),
                expires_in: Some(3600),
                scope: None,
            })
        }

        fn auth_url(&self, _redirect_uri: &str) -> String {
            String::new()
        }
    }

    fn manager(endpoint: Arc<StubEndpoint>, fallback: Option<&str>) -> CredentialManager {
        CredentialManager::new(
            "gmail".into(),
            fallback.map(String::from),
            endpoint,
            Arc::new(TokenStore::disconnected()),
        )
    }

    fn grant(expires_in: u64) -> TokenGrant {
        TokenGrant {
            access_token: "seeded-access".into(),
            refresh_token: Some("seeded-refresh".into()),
            expires_in: Some(expires_in),
            scope: None,
        }
    }

    #[tokio::test]
    async fn test_valid_cached_token_skips_refresh() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), None);

        mgr.install(grant(3600)).await.unwrap();

        let token = mgr.access_token(false).await.unwrap();
        assert_eq!(token, "seeded-access");
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_inside_safety_window_triggers_one_refresh() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), None);

        // Expires in 30s, inside the 60s safety window.
        mgr.install(grant(30)).await.unwrap();

        let token = mgr.access_token(false).await.unwrap();
        assert_eq!(token, "access-1");
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_cached_expiry() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), None);

        mgr.install(grant(3600)).await.unwrap();

        let token = mgr.access_token(true).await.unwrap();
        assert_eq!(token, "access-1");
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_refreshed_token_is_cached_for_next_call() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), Some("env-refresh"));

        let first = mgr.access_token(false).await.unwrap();
        let second = mgr.access_token(false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_when_nothing_resolves() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), None);

        let err = mgr.access_token(false).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential));
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_env_fallback_refresh_token_is_used() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint.clone(), Some("env-refresh"));

        mgr.access_token(false).await.unwrap();
        assert_eq!(
            endpoint.last_refresh_token.lock().unwrap().as_deref(),
            Some("env-refresh")
        );
    }

    #[tokio::test]
    async fn test_revoked_credential_propagates() {
        let endpoint = Arc::new(StubEndpoint::revoked());
        let mgr = manager(endpoint.clone(), Some("env-refresh"));

        let err = mgr.access_token(false).await.unwrap_err();
        assert!(matches!(err, RelayError::RevokedCredential));
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_replaces_cached_one() {
        let endpoint = Arc::new(StubEndpoint::rotating("rotated-refresh"));
        let mgr = manager(endpoint.clone(), None);

        mgr.install(grant(30)).await.unwrap();

        // First call refreshes and should adopt the rotated refresh token.
        mgr.access_token(false).await.unwrap();
        assert_eq!(
            endpoint.last_refresh_token.lock().unwrap().as_deref(),
            Some("seeded-refresh")
        );

        // Forced second refresh must present the rotated token.
        mgr.access_token(true).await.unwrap();
        assert_eq!(
            endpoint.last_refresh_token.lock().unwrap().as_deref(),
            Some("rotated-refresh")
        );
    }

    #[tokio::test]
    async fn test_install_without_refresh_token_fails() {
        let endpoint = Arc::new(StubEndpoint::new());
        let mgr = manager(endpoint, None);

        let g = TokenGrant {
            access_token: "a".into(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
        };
        assert!(matches!(
            mgr.install(g).await.unwrap_err(),
            RelayError::MissingCredential
        ));
    }
}
