//! Backend URL overrides.
//!
//! Changes take effect on the next dispatch and the next push connection
//! attempt; an established push connection is left alone.

use std::collections::HashMap;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use slidepilot_core::settings::{Settings, BACKEND_URL_KEY, BACKEND_WS_KEY};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const KNOWN_KEYS: [&str; 2] = [BACKEND_URL_KEY, BACKEND_WS_KEY];

/// GET /api/settings
async fn get_settings(State(state): State<AppState>) -> Json<DataResponse<Settings>> {
    Json(DataResponse {
        data: state.settings.snapshot().await,
    })
}

/// PUT /api/settings
///
/// Only the given keys change. `null` or an empty string clears a key.
async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<HashMap<String, Option<String>>>,
) -> AppResult<Json<DataResponse<Settings>>> {
    if let Some(unknown) = body.keys().find(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        return Err(AppError::BadRequest(format!("Unknown setting '{unknown}'")));
    }

    let data = state.settings.update(body).await?;
    tracing::info!(
        backend_url = data.get(BACKEND_URL_KEY).map(String::as_str).unwrap_or("<default>"),
        backend_ws = data.get(BACKEND_WS_KEY).map(String::as_str).unwrap_or("<derived>"),
        "Settings updated",
    );
    Ok(Json(DataResponse { data }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}
