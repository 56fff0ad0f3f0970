//! Poll fallback for job status.
//!
//! Used when the push channel is down at dispatch time. Each loop owns one
//! (job, context) pair, checks `GET /api/job-status/{id}` immediately and
//! then at a fixed interval, and stops only after it has observed and
//! delivered a terminal status. Transport and parse failures are logged
//! and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use slidepilot_backend::api::BackendApi;
use slidepilot_core::types::{ContextId, JobId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::registry::SubscriptionRegistry;

/// Interval between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Spawns and tracks independent poll loops.
pub struct Poller {
    registry: Arc<SubscriptionRegistry>,
    interval: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(registry: Arc<SubscriptionRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Start polling `job_id` on behalf of `context_id`.
    ///
    /// The loop shares no timer state with other loops. The returned handle
    /// resolves once the loop has stopped.
    pub fn start_polling(&self, api: BackendApi, job_id: JobId, context_id: ContextId) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let interval = self.interval;
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            poll_job(api, registry, job_id, context_id, interval, cancel).await;
        })
    }

    /// Number of poll loops still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Stop every loop and wait for them to exit.
    pub async fn shutdown(&self) {
        let active = self.active();
        tracing::info!(active, "Stopping poll loops");
        self.cancel.cancel();
        self.tracker.close();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.tracker.wait()).await;
    }
}

async fn poll_job(
    api: BackendApi,
    registry: Arc<SubscriptionRegistry>,
    job_id: JobId,
    context_id: ContextId,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(job_id = %job_id, context_id = %context_id, "Polling job status");
    let mut ticks = 0u64;

    loop {
        ticks += 1;
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = api.job_status(&job_id) => result,
        };

        match result {
            Ok(snapshot) => {
                let terminal = snapshot.status.is_terminal();
                tracing::debug!(job_id = %job_id, status = %snapshot.status, ticks, "Polled job status");
                registry
                    .notify_context(&job_id, &context_id, snapshot.status, snapshot.job)
                    .await;
                if terminal {
                    tracing::info!(job_id = %job_id, ticks, "Job reached terminal status, polling stopped");
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    failure = %e.kind(),
                    error = %e,
                    "Job status poll failed",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
