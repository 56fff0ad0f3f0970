//! Resolution of the backend addresses from persisted settings.

use crate::settings::{Settings, SettingsStore, BACKEND_URL_KEY, BACKEND_WS_KEY};

/// HTTP base used for backend calls when `backendUrl` is unset.
pub const DEFAULT_HTTP_BASE_URL: &str = "http://localhost:9000";

/// Base used only to derive the push URL when neither `backendWs` nor
/// `backendUrl` is set. Differs from [`DEFAULT_HTTP_BASE_URL`].
pub const DEFAULT_PUSH_BASE_URL: &str = "http://localhost:8000";

/// Path appended to the base URL to reach the push endpoint.
pub const PUSH_PATH: &str = "/ws";

/// Backend addresses in effect for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub http_base_url: String,
    pub push_url: String,
}

impl BackendConfig {
    /// Resolve from the current contents of the settings store.
    ///
    /// Never fails; every missing value falls back to a local default.
    pub async fn resolve(store: &SettingsStore) -> Self {
        Self::from_settings(&store.snapshot().await)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let lookup = |key: &str| settings.get(key).filter(|v| !v.is_empty());
        let backend_url = lookup(BACKEND_URL_KEY);

        let http_base_url = backend_url
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BASE_URL.to_string());

        let push_url = match lookup(BACKEND_WS_KEY) {
            Some(explicit) => explicit.clone(),
            None => derive_push_url(backend_url.map_or(DEFAULT_PUSH_BASE_URL, String::as_str)),
        };

        Self {
            http_base_url,
            push_url,
        }
    }
}

/// Map an HTTP base URL to the push URL: the leading `http` becomes `ws`
/// (so `https` becomes `wss`) and [`PUSH_PATH`] is appended.
pub fn derive_push_url(base: &str) -> String {
    match base.strip_prefix("http") {
        Some(rest) => format!("ws{rest}{PUSH_PATH}"),
        None => format!("{base}{PUSH_PATH}"),
    }
}
