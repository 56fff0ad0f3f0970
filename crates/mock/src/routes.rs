use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use slidepilot_core::job::JobStatus;
use slidepilot_core::messages::RequestKind;
use slidepilot_core::types::JobId;
use tokio::sync::broadcast::error::RecvError;

use crate::jobs::JobStore;

/// Build the mock backend route tree.
///
/// ```text
/// POST /api/generate-outline
/// POST /api/generate-image
/// POST /api/generate-ppt
/// GET  /api/job-status/{job_id}
/// GET  /ws                         push channel
/// ```
pub fn router(store: Arc<JobStore>) -> Router {
    Router::new()
        .route(
            RequestKind::GenerateOutline.endpoint(),
            enqueue_route(RequestKind::GenerateOutline),
        )
        .route(
            RequestKind::GenerateImage.endpoint(),
            enqueue_route(RequestKind::GenerateImage),
        )
        .route(
            RequestKind::GeneratePpt.endpoint(),
            enqueue_route(RequestKind::GeneratePpt),
        )
        .route("/api/job-status/{job_id}", get(job_status))
        .route("/ws", get(push_handler))
        .with_state(store)
}

/// Every generation endpoint queues a job and answers `{job_id, status}`.
fn enqueue_route(kind: RequestKind) -> MethodRouter<Arc<JobStore>> {
    post(
        move |State(store): State<Arc<JobStore>>, Json(payload): Json<Value>| async move {
            let job_id = store.enqueue(kind, payload).await;
            Json(json!({"job_id": job_id, "status": JobStatus::Queued}))
        },
    )
}

async fn job_status(
    State(store): State<Arc<JobStore>>,
    Path(job_id): Path<String>,
) -> Json<Value> {
    Json(store.status_body(&JobId::new(job_id)).await)
}

async fn push_handler(ws: WebSocketUpgrade, State(store): State<Arc<JobStore>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_updates(socket, store))
}

/// Forward broadcast job updates to one push subscriber until either side
/// goes away. Inbound frames are read and discarded.
async fn forward_updates(socket: WebSocket, store: Arc<JobStore>) {
    let mut updates = store.subscribe();
    let (mut sink, mut stream) = socket.split();
    tracing::info!("Push subscriber connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(frame) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push subscriber lagging, updates dropped");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Push subscriber disconnected");
}
