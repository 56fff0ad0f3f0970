//! Push-channel message processing loop.
//!
//! Reads raw frames from the push connection, parses them into
//! [`PushMessage`]s and hands job updates to the [`JobUpdateSink`].

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::channel::JobUpdateSink;
use crate::client::PushStream;
use crate::messages::{parse_message, PushMessage};

/// Process frames until the connection closes, fails, or `cancel` fires.
///
/// Malformed frames are logged and skipped. On a receive error the
/// connection is closed explicitly before returning so no half-open socket
/// is left behind.
pub async fn process_messages(
    ws_stream: &mut PushStream,
    sink: &dyn JobUpdateSink,
    cancel: &CancellationToken,
) {
    loop {
        let msg_result = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_stream.close(None).await;
                return;
            }
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => {
                    tracing::info!("Push stream exhausted");
                    return;
                }
            },
        };

        match msg_result {
            Ok(Message::Text(text)) => {
                handle_text_message(text.as_str(), sink).await;
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary push frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Backend closed push channel");
                return;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Push channel receive error");
                let _ = ws_stream.close(None).await;
                return;
            }
        }
    }
}

/// Dispatch a single text frame.
async fn handle_text_message(text: &str, sink: &dyn JobUpdateSink) {
    match parse_message(text) {
        Ok(PushMessage::JobUpdate(update)) => {
            tracing::debug!(
                job_id = %update.job_id,
                status = %update.status,
                "Job update received",
            );
            sink.job_update(update).await;
        }
        Ok(PushMessage::Other { kind }) => {
            tracing::trace!(kind = ?kind, "Ignoring push message");
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw_message = %text,
                "Failed to parse push message",
            );
        }
    }
}
