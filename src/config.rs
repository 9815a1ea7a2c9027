use anyhow::{Context, Result};

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    pub base_url: String,

    // ── Database (PostgreSQL; optional — absent means in-memory-only) ──
    pub database_url: Option<String>,

    // ── Google OAuth ────────────────────────────────────────────────────
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    /// Static refresh-token fallback used when neither the in-process cache
    /// nor the token store has one.
    pub google_refresh_token: Option<String>,

    // ── Gmail / OTP ─────────────────────────────────────────────────────
    /// Mailbox the relay reads from ("me" or a full address).
    pub gmail_user: String,
    /// Gmail search query used when polling for OTP mail.
    pub otp_search_query: String,
    /// Cap on how many message ids a poll lists.
    pub otp_max_results: u32,
    /// Row id of the credential record in the token store.
    pub token_record_id: String,
}

const DEFAULT_SEARCH_QUERY: &str = "subject:(OTP OR verification code) newer_than:1d";

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8420".into());

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8420".into())
                .parse()
                .context("Invalid PORT")?,

            // POSTGRES_URL is accepted as a fallback for managed-hosting setups
            // that only inject that name.
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("POSTGRES_URL"))
                .ok(),

            google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID is required")?,
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .context("GOOGLE_CLIENT_SECRET is required")?,
            google_redirect_uri: std::env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{base_url}/v1/oauth/callback")),
            google_refresh_token: std::env::var("GOOGLE_REFRESH_TOKEN").ok(),

            gmail_user: std::env::var("GMAIL_USER").context("GMAIL_USER is required")?,
            otp_search_query: std::env::var("OTP_SEARCH_QUERY")
                .unwrap_or_else(|_| DEFAULT_SEARCH_QUERY.into()),
            otp_max_results: std::env::var("OTP_MAX_RESULTS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .context("Invalid OTP_MAX_RESULTS")?,
            token_record_id: std::env::var("TOKEN_RECORD_ID").unwrap_or_else(|_| "gmail".into()),

            base_url,
        })
    }
}
