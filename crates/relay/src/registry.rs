//! Job subscription registry.
//!
//! Maps a [`JobId`] to the page contexts waiting for it and turns job
//! updates into `job-status` notifications. Both the push channel (through
//! the [`JobUpdateSink`] impl) and the poll fallback deliver through here.
//!
//! A (job, context) pair is registered at most once. Records are dropped as
//! soon as the component that observed a terminal status has delivered it,
//! so the map only holds jobs that are still in flight.

use std::collections::HashMap;
use std::sync::Arc;

use slidepilot_backend::channel::JobUpdateSink;
use slidepilot_backend::messages::JobUpdate;
use slidepilot_core::job::JobStatus;
use slidepilot_core::messages::ContextMessage;
use slidepilot_core::types::{ContextId, JobId};
use tokio::sync::RwLock;

/// Best-effort delivery of a message to one page context.
///
/// Returns `false` when the context no longer exists; never fails loudly.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, context_id: &ContextId, message: &ContextMessage) -> bool;
}

pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<JobId, Vec<ContextId>>>,
    notifier: Arc<dyn Notifier>,
}

impl SubscriptionRegistry {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            notifier,
        }
    }

    /// Register `context_id` for updates on `job_id`.
    ///
    /// Returns `false` if the pair was already registered.
    pub async fn subscribe(&self, job_id: JobId, context_id: ContextId) -> bool {
        let mut subs = self.subscriptions.write().await;
        let contexts = subs.entry(job_id.clone()).or_default();
        if contexts.contains(&context_id) {
            tracing::debug!(job_id = %job_id, context_id = %context_id, "Already subscribed");
            return false;
        }
        contexts.push(context_id.clone());
        tracing::debug!(
            job_id = %job_id,
            context_id = %context_id,
            subscribers = contexts.len(),
            "Subscribed context to job",
        );
        true
    }

    /// Deliver one `job-status` notification to every subscriber of a job.
    ///
    /// A failed delivery does not affect the others. A terminal status
    /// drops the job's record. Returns the number of successful deliveries.
    pub async fn notify(&self, job_id: &JobId, status: JobStatus, job: serde_json::Value) -> usize {
        let contexts = self.subscribers(job_id).await;
        if contexts.is_empty() {
            tracing::debug!(job_id = %job_id, status = %status, "No subscribers for job update");
            return 0;
        }

        let terminal = status.is_terminal();
        let message = ContextMessage::job_status(status, job);
        let mut delivered = 0;
        for context_id in &contexts {
            if self.notifier.deliver(context_id, &message).await {
                delivered += 1;
            } else {
                tracing::debug!(job_id = %job_id, context_id = %context_id, "Context gone, notification dropped");
            }
        }

        if terminal {
            self.subscriptions.write().await.remove(job_id);
            tracing::info!(job_id = %job_id, delivered, "Job finished, subscriptions released");
        }
        delivered
    }

    /// Deliver a `job-status` notification to a single context.
    ///
    /// Used by the poll fallback, which tracks one (job, context) pair. A
    /// terminal status drops that pair only.
    pub async fn notify_context(
        &self,
        job_id: &JobId,
        context_id: &ContextId,
        status: JobStatus,
        job: serde_json::Value,
    ) -> bool {
        let terminal = status.is_terminal();
        let message = ContextMessage::job_status(status, job);
        let delivered = self.notifier.deliver(context_id, &message).await;
        if !delivered {
            tracing::debug!(job_id = %job_id, context_id = %context_id, "Context gone, notification dropped");
        }

        if terminal {
            let mut subs = self.subscriptions.write().await;
            if let Some(contexts) = subs.get_mut(job_id) {
                contexts.retain(|c| c != context_id);
                if contexts.is_empty() {
                    subs.remove(job_id);
                }
            }
        }
        delivered
    }

    /// Deliver an arbitrary message (e.g. a synchronous result) to a context.
    pub async fn relay(&self, context_id: &ContextId, message: &ContextMessage) -> bool {
        self.notifier.deliver(context_id, message).await
    }

    /// Contexts currently subscribed to `job_id`, in registration order.
    pub async fn subscribers(&self, job_id: &JobId) -> Vec<ContextId> {
        self.subscriptions
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of jobs with at least one subscriber.
    pub async fn job_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[async_trait::async_trait]
impl JobUpdateSink for SubscriptionRegistry {
    async fn job_update(&self, update: JobUpdate) {
        self.notify(&update.job_id, update.status, update.job).await;
    }
}
