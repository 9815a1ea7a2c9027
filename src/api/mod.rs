//! API router for the otp-relay service.
//!
//! Endpoint groups under /v1/:
//! - /v1/otp    — latest-OTP poll
//! - /v1/oauth  — consent URL + one-shot code exchange callback
//! - /v1/status — health check

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/v1", routes::v1_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
