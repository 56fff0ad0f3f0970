//! Shared helpers for backend crate integration tests: a scriptable push
//! server and a sink that records what the channel delivers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use slidepilot_backend::channel::JobUpdateSink;
use slidepilot_backend::messages::JobUpdate;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Commands a test can issue to one accepted push connection.
pub enum ServerCommand {
    Send(String),
    Close,
}

/// Loopback push endpoint that counts connections.
pub struct PushServer {
    pub url: String,
    pub accepted: Arc<AtomicUsize>,
    pub open: Arc<AtomicUsize>,
    pub max_open: Arc<AtomicUsize>,
    connections: mpsc::UnboundedReceiver<mpsc::UnboundedSender<ServerCommand>>,
}

impl PushServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let open = Arc::new(AtomicUsize::new(0));
        let max_open = Arc::new(AtomicUsize::new(0));
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();

        let (acc, op, max) = (accepted.clone(), open.clone(), max_open.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                acc.fetch_add(1, Ordering::SeqCst);
                let now_open = op.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(now_open, Ordering::SeqCst);

                let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
                let _ = conn_tx.send(cmd_tx);
                let op = op.clone();

                tokio::spawn(async move {
                    let mut commands_open = true;
                    loop {
                        tokio::select! {
                            cmd = cmd_rx.recv(), if commands_open => match cmd {
                                Some(ServerCommand::Send(text)) => {
                                    if ws.send(Message::text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                Some(ServerCommand::Close) => {
                                    let _ = ws.close(None).await;
                                    break;
                                }
                                // Test dropped the handle; keep the socket open.
                                None => commands_open = false,
                            },
                            frame = ws.next() => match frame {
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                    op.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            url: format!("ws://{addr}/ws"),
            accepted,
            open,
            max_open,
            connections: conn_rx,
        }
    }

    /// Wait for the next accepted connection.
    pub async fn next_connection(&mut self) -> mpsc::UnboundedSender<ServerCommand> {
        tokio::time::timeout(Duration::from_secs(5), self.connections.recv())
            .await
            .expect("timed out waiting for a push connection")
            .expect("push server stopped")
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Sink forwarding every update into a channel the test can read.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<JobUpdate>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<JobUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait::async_trait]
impl JobUpdateSink for RecordingSink {
    async fn job_update(&self, update: JobUpdate) {
        let _ = self.tx.send(update);
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
