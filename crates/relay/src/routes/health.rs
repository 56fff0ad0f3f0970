use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use slidepilot_backend::channel::PushChannelState;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Current state of the backend push channel.
    pub push_state: PushChannelState,
}

/// GET /health -- the relay is up; push is reported but never makes it
/// unhealthy since polling covers for it.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        push_state: state.push.state(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
