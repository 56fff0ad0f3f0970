use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use slidepilot_core::messages::{ContextMessage, DispatchAck, RelayEnvelope};
use slidepilot_core::types::ContextId;

use crate::state::AppState;

/// HTTP handler that upgrades the connection to a page-context WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single page context after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the context with the hub under a fresh id.
///   2. Spawns a sender task that forwards frames from the hub channel.
///   3. Dispatches inbound requests, each on its own task.
///   4. Cleans up on disconnect.
///
/// Subscriptions of a departed context are left to expire with their job;
/// deliveries to it simply fail.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let context_id = ContextId::generate();
    tracing::info!(context_id = %context_id, "Page context connected");

    let mut rx = state.hub.add(context_id.clone()).await;
    let (mut sink, mut stream) = socket.split();

    let sender_context = context_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(context_id = %sender_context, "Page-context sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_text(&state, &context_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(context_id = %context_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(context_id = %context_id, error = %e, "Page-context receive error");
                break;
            }
        }
    }

    state.hub.remove(&context_id).await;
    send_task.abort();
    tracing::info!(context_id = %context_id, "Page context disconnected");
}

/// Parse one inbound frame and dispatch it in the background.
///
/// Malformed frames are answered with a failed ack straight away so the
/// page is never left waiting.
async fn handle_text(state: &AppState, context_id: &ContextId, text: &str) {
    let envelope = match RelayEnvelope::parse(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(context_id = %context_id, error = %e, "Unparseable page-context frame");
            let ack = DispatchAck::failed(format!("invalid request: {e}"));
            state.hub.send(context_id, &ContextMessage::Ack(ack)).await;
            return;
        }
    };

    let request_id = envelope.request_id.clone();
    let kind = envelope.kind;
    let request = match envelope.into_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(
                context_id = %context_id,
                kind = kind.as_str(),
                error = %e,
                "Invalid request payload",
            );
            let ack = DispatchAck::failed(format!("invalid {} payload: {e}", kind.as_str()))
                .with_request_id(request_id);
            state.hub.send(context_id, &ContextMessage::Ack(ack)).await;
            return;
        }
    };

    let state = state.clone();
    let context_id = context_id.clone();
    tokio::spawn(async move {
        let ack = state
            .dispatcher
            .dispatch(&request, &context_id)
            .await
            .with_request_id(request_id);
        if !state.hub.send(&context_id, &ContextMessage::Ack(ack)).await {
            tracing::debug!(context_id = %context_id, "Context gone before acknowledgement");
        }
    });
}
