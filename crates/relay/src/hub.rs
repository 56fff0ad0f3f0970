//! Registry of connected page contexts.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use slidepilot_core::messages::ContextMessage;
use slidepilot_core::types::{ContextId, Timestamp};
use tokio::sync::{mpsc, RwLock};

use crate::registry::Notifier;

/// Channel sender half for pushing frames to a page context's socket.
pub type ContextSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single page-context connection.
pub struct ContextConnection {
    /// Channel sender for outbound frames to this context.
    pub sender: ContextSender,
    /// When this context connected.
    pub connected_at: Timestamp,
}

/// Tracks every live page context and its outbound channel.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across the
/// relay.
pub struct ContextHub {
    contexts: RwLock<HashMap<ContextId, ContextConnection>>,
}

impl ContextHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Register a context.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward frames to the WebSocket sink.
    pub async fn add(&self, context_id: ContextId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ContextConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.contexts.write().await.insert(context_id, conn);
        rx
    }

    /// Remove a context by its ID.
    pub async fn remove(&self, context_id: &ContextId) {
        let removed = self.contexts.write().await.remove(context_id);
        if let Some(conn) = removed {
            let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
            tracing::debug!(context_id = %context_id, connected_secs, "Context removed from hub");
        }
    }

    /// Send a message to one context.
    ///
    /// Returns `false` if the message cannot be serialized, the context is
    /// unknown or its channel is closed.
    pub async fn send(&self, context_id: &ContextId, message: &ContextMessage) -> bool {
        let Some(text) = message.to_json() else {
            return false;
        };
        let contexts = self.contexts.read().await;
        match contexts.get(context_id) {
            Some(conn) => conn.sender.send(Message::Text(text.into())).is_ok(),
            None => false,
        }
    }

    /// Return the current number of connected contexts.
    pub async fn connection_count(&self) -> usize {
        self.contexts.read().await.len()
    }

    /// Send a Close frame to every context, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut contexts = self.contexts.write().await;
        let count = contexts.len();
        for conn in contexts.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        contexts.clear();
        tracing::info!(count, "Closed all page-context connections");
    }

    /// Send a Ping frame to every context.
    pub async fn ping_all(&self) {
        let contexts = self.contexts.read().await;
        for conn in contexts.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for ContextHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for ContextHub {
    async fn deliver(&self, context_id: &ContextId, message: &ContextMessage) -> bool {
        self.send(context_id, message).await
    }
}
