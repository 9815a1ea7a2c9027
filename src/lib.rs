pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gmail;
pub mod otp;
pub mod providers;
pub mod store;

pub use config::Config;
pub use error::RelayError;

use std::sync::Arc;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<store::TokenStore>,
    pub endpoint: Arc<dyn providers::TokenEndpoint>,
    pub credentials: Arc<credentials::CredentialManager>,
    pub gmail: gmail::MailClient,
    pub patterns: otp::PatternSet,
}

pub type SharedState = Arc<AppState>;
