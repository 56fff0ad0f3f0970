//! Long-lived push channel to the backend.
//!
//! [`PushChannel`] owns at most one WebSocket connection to the backend's
//! push endpoint. A single supervisor task runs the whole lifecycle:
//!
//! ```text
//! disconnected -> connecting -> connected -> (close / error) -> disconnected
//!       ^                                                            |
//!       +------------------- fixed reconnect delay <-----------------+
//! ```
//!
//! Because only the supervisor ever opens a connection, there is never more
//! than one connection attempt in flight and never more than one pending
//! reconnect. [`PushChannel::connect`] merely starts the supervisor or cuts
//! the pending delay short.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use slidepilot_core::backend_config::BackendConfig;
use slidepilot_core::settings::SettingsStore;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

use crate::client::PushClient;
use crate::messages::JobUpdate;
use crate::processor::process_messages;

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Receiver of job updates arriving on the push channel.
#[async_trait::async_trait]
pub trait JobUpdateSink: Send + Sync {
    async fn job_update(&self, update: JobUpdate);
}

/// Connection state of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PushChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Tunables for the push channel.
#[derive(Debug, Clone)]
pub struct PushChannelConfig {
    /// Fixed wait after a close or failed attempt. No backoff.
    pub reconnect_delay: Duration,
}

impl Default for PushChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Counters exposed on the relay status route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PushChannelStats {
    pub connection_attempts: u64,
    pub sessions: u64,
}

/// The process-wide push channel.
pub struct PushChannel {
    settings: Arc<SettingsStore>,
    sink: Arc<dyn JobUpdateSink>,
    config: PushChannelConfig,
    state_tx: watch::Sender<PushChannelState>,
    /// Set once the supervisor task has been spawned.
    started: AtomicBool,
    /// Wakes the supervisor out of its reconnect delay.
    wake: Notify,
    cancel: CancellationToken,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    connection_attempts: AtomicU64,
    sessions: AtomicU64,
}

impl PushChannel {
    /// Create a disconnected channel. Nothing happens until
    /// [`connect`](Self::connect) is called.
    pub fn new(
        settings: Arc<SettingsStore>,
        sink: Arc<dyn JobUpdateSink>,
        config: PushChannelConfig,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(PushChannelState::Disconnected);
        Arc::new(Self {
            settings,
            sink,
            config,
            state_tx,
            started: AtomicBool::new(false),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            connection_attempts: AtomicU64::new(0),
            sessions: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> PushChannelState {
        *self.state_tx.borrow()
    }

    /// Whether push delivery can be relied on right now.
    pub fn is_connected(&self) -> bool {
        self.state() == PushChannelState::Connected
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<PushChannelState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> PushChannelStats {
        PushChannelStats {
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
        }
    }

    /// Ensure a connection is being established.
    ///
    /// No-op while connecting or connected. The first call spawns the
    /// supervisor; later calls made during a reconnect delay start the
    /// next attempt immediately instead of waiting it out.
    pub fn connect(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            return;
        }

        match self.state() {
            PushChannelState::Connecting | PushChannelState::Connected => {
                tracing::trace!("Push channel already active, connect ignored");
            }
            PushChannelState::Disconnected => {
                if self.started.swap(true, Ordering::SeqCst) {
                    self.wake.notify_one();
                } else {
                    self.set_state(PushChannelState::Connecting);
                    let channel = Arc::clone(self);
                    let handle = tokio::spawn(async move {
                        channel.run().await;
                    });
                    if let Ok(mut task) = self.task.lock() {
                        *task = Some(handle);
                    }
                }
            }
        }
    }

    /// Stop the supervisor and close the connection, waiting up to five
    /// seconds for a clean exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down push channel");
        self.cancel.cancel();

        let handle = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
        self.state_tx.send_replace(PushChannelState::Disconnected);
    }

    // ---- private helpers ----

    fn set_state(&self, state: PushChannelState) {
        self.state_tx.send_replace(state);
    }

    /// Supervisor loop: connect -> process -> wait -> reconnect.
    ///
    /// Runs until the cancellation token fires.
    async fn run(self: Arc<Self>) {
        tracing::info!("Push channel supervisor started");

        loop {
            self.set_state(PushChannelState::Connecting);
            // A wake-up stored while we were not waiting is stale now.
            let _ = self.wake.notified().now_or_never();

            let config = BackendConfig::resolve(&self.settings).await;
            let client = PushClient::new(config.push_url);
            let attempt = self.connection_attempts.fetch_add(1, Ordering::Relaxed) + 1;

            tracing::info!(push_url = %client.push_url(), attempt, "Connecting push channel");

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => None,
                result = client.connect() => match result {
                    Ok(ws_stream) => Some(ws_stream),
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "Push channel connection failed");
                        None
                    }
                },
            };

            if let Some(mut ws_stream) = connected {
                self.set_state(PushChannelState::Connected);
                self.sessions.fetch_add(1, Ordering::Relaxed);

                process_messages(&mut ws_stream, self.sink.as_ref(), &self.cancel).await;
                drop(ws_stream);
            }

            self.set_state(PushChannelState::Disconnected);
            if self.cancel.is_cancelled() {
                break;
            }

            tracing::info!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Push channel closed, reconnect scheduled",
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = self.wake.notified() => {
                    tracing::debug!("Reconnect requested before delay elapsed");
                }
            }
        }

        tracing::info!("Push channel supervisor exited");
    }
}
