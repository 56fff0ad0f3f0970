//! WebSocket client for the backend push endpoint.
//!
//! [`PushClient`] holds the URL of one push endpoint. Call
//! [`PushClient::connect`] to establish a live [`PushStream`].

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Raw stream type of an established push connection.
pub type PushStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection handle for the backend push endpoint.
pub struct PushClient {
    push_url: String,
}

impl PushClient {
    /// * `push_url` - full WebSocket URL, e.g. `ws://localhost:8000/ws`.
    pub fn new(push_url: String) -> Self {
        Self { push_url }
    }

    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    /// Open the WebSocket connection.
    pub async fn connect(&self) -> Result<PushStream, PushClientError> {
        let (ws_stream, _response) = connect_async(self.push_url.as_str())
            .await
            .map_err(|e| {
                PushClientError::Connection(format!(
                    "Failed to connect to push endpoint at {}: {e}",
                    self.push_url
                ))
            })?;

        tracing::info!(push_url = %self.push_url, "Connected to backend push endpoint");

        Ok(ws_stream)
    }
}

/// Errors that can occur when working with the push client.
#[derive(Debug, thiserror::Error)]
pub enum PushClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
