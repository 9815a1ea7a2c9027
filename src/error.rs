use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the otp-relay service.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    // ── Credential Errors ───────────────────────────────────────────────
    #[error("No refresh token available; re-authorization required")]
    MissingCredential,

    #[error("Refresh token revoked or expired; re-authorization required")]
    RevokedCredential,

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    // ── Mail API Errors ─────────────────────────────────────────────────
    #[error("Mail API returned {status}: {body}")]
    MailApi { status: u16, body: String },

    // ── Infrastructure ──────────────────────────────────────────────────
    #[error("Token store error: {0}")]
    Persistence(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        RelayError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // Credential failures map to 401 so pollers can tell "operator must
        // re-connect" apart from "keep polling" (a 200 with null data).
        let (status, code) = match &self {
            RelayError::MissingCredential => (StatusCode::UNAUTHORIZED, "reauthorize_required"),
            RelayError::RevokedCredential => (StatusCode::UNAUTHORIZED, "credential_revoked"),
            RelayError::TokenEndpoint { .. } => (StatusCode::BAD_GATEWAY, "token_endpoint_error"),
            RelayError::MailApi { .. } => (StatusCode::BAD_GATEWAY, "mail_api_error"),
            RelayError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            RelayError::Transport(_) => (StatusCode::BAD_GATEWAY, "transport_error"),
            RelayError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RelayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
