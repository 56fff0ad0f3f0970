pub mod health;
pub mod settings;
pub mod status;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws              WebSocket upgrade for a page context
/// /status          relay status snapshot (GET)
/// /settings        backend URL overrides (GET, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(status::router())
        .merge(settings::router())
}
