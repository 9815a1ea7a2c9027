//! Route handlers for the otp-relay service.
//!
//! All handlers receive `SharedState` via Axum state extraction. The OTP
//! poll endpoint keeps "no OTP yet" (200 with null data) strictly apart from
//! credential failures (401 with an error code), so pollers know whether to
//! keep polling or send the operator back through the consent flow.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::RelayError;
use crate::SharedState;

// =============================================================================
// V1 Router
// =============================================================================

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        // ── Health ───────────────────────────────────────────────────────
        .route("/status", get(status))
        // ── OTP ──────────────────────────────────────────────────────────
        .route("/otp/latest", get(otp_latest))
        // ── OAuth ────────────────────────────────────────────────────────
        .route("/oauth/auth-url", get(oauth_auth_url))
        .route("/oauth/callback", get(oauth_callback))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "otp-relay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// OTP
// =============================================================================

/// GET /v1/otp/latest — Poll the mailbox for the newest OTP mail.
///
/// `{"data": null}` means nothing matched the search query yet; the result
/// object carries a null `otp` when mail arrived but no pattern matched.
async fn otp_latest(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, RelayError> {
    let result = crate::otp::latest(
        &state.gmail,
        &state.patterns,
        &state.config.otp_search_query,
        state.config.otp_max_results,
    )
    .await?;

    Ok(Json(json!({ "data": result })))
}

// =============================================================================
// OAuth Endpoints
// =============================================================================

/// GET /v1/oauth/auth-url — Build the Google consent URL for (re-)connecting.
async fn oauth_auth_url(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let url = state
        .endpoint
        .auth_url(&state.config.google_redirect_uri);
    Json(json!({ "data": { "url": url } }))
}

#[derive(Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    /// Set by the provider when the operator denied consent.
    error: Option<String>,
}

/// GET /v1/oauth/callback — One-shot authorization-code exchange.
///
/// Persists the new token triple (overwriting any existing record) and
/// reseeds the in-process cache. Interactive and human-supervised: failures
/// surface the provider's payload to the operator and are never retried here.
async fn oauth_callback(
    State(state): State<SharedState>,
    Query(q): Query<CallbackQuery>,
) -> Result<Json<serde_json::Value>, RelayError> {
    if let Some(err) = q.error {
        return Err(RelayError::BadRequest(format!(
            "provider returned error: {err}"
        )));
    }

    let code = q
        .code
        .ok_or_else(|| RelayError::BadRequest("missing ?code parameter".into()))?;

    let grant = state
        .endpoint
        .exchange_code(&code, &state.config.google_redirect_uri)
        .await?;

    let record = state.credentials.install(grant).await?;

    Ok(Json(json!({
        "data": {
            "connected": true,
            "record_id": record.id,
            "expires_at": record.expires_at,
        }
    })))
}
