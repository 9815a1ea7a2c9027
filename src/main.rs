use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use otp_relay::credentials::CredentialManager;
use otp_relay::gmail::{HttpTransport, MailClient};
use otp_relay::otp::PatternSet;
use otp_relay::providers::{GoogleTokenEndpoint, TokenEndpoint};
use otp_relay::store::TokenStore;
use otp_relay::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "otp_relay=info".into()),
        )
        .init();

    // Load config
    let config = Config::from_env()?;
    info!("otp-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    // Token store — degrades to in-memory-only when no database is reachable
    let store = Arc::new(TokenStore::connect(config.database_url.as_deref()).await);
    if let Err(e) = store.migrate().await {
        warn!("Token store migration failed ({e}); continuing without persistence");
    }

    // Provider endpoint + credential manager
    let endpoint: Arc<dyn TokenEndpoint> = Arc::new(GoogleTokenEndpoint::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    ));
    let credentials = Arc::new(CredentialManager::new(
        config.token_record_id.clone(),
        config.google_refresh_token.clone(),
        endpoint.clone(),
        store.clone(),
    ));

    // Mail client
    let gmail = MailClient::new(
        config.gmail_user.clone(),
        credentials.clone(),
        Arc::new(HttpTransport::new()),
    );

    // Build shared state
    let state: SharedState = Arc::new(AppState {
        config: config.clone(),
        store,
        endpoint,
        credentials,
        gmail,
        patterns: PatternSet::default(),
    });

    // Build router
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready ✓");
    axum::serve(listener, app).await?;

    Ok(())
}
