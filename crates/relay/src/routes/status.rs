//! Relay status snapshot.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use slidepilot_backend::channel::PushChannelState;

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RelayStatus {
    pub push_state: PushChannelState,
    pub connection_attempts: u64,
    pub sessions: u64,
    /// Jobs with at least one subscribed context.
    pub subscribed_jobs: usize,
    pub active_polls: usize,
    /// Connected page contexts.
    pub contexts: usize,
}

/// GET /api/status
async fn get_status(State(state): State<AppState>) -> Json<DataResponse<RelayStatus>> {
    let stats = state.push.stats();
    let status = RelayStatus {
        push_state: state.push.state(),
        connection_attempts: stats.connection_attempts,
        sessions: stats.sessions,
        subscribed_jobs: state.registry.job_count().await,
        active_polls: state.poller.active(),
        contexts: state.hub.connection_count().await,
    };
    Json(DataResponse { data: status })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
