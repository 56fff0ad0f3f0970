//! Request dispatcher.
//!
//! Forwards a page context's generation request to the backend and decides
//! how the result travels back: relayed at once when the backend answered
//! synchronously, or via the subscription registry when it queued a job.

use std::sync::Arc;

use slidepilot_backend::api::{BackendApi, GenerateOutcome};
use slidepilot_backend::channel::PushChannel;
use slidepilot_core::backend_config::BackendConfig;
use slidepilot_core::job::JobStatus;
use slidepilot_core::messages::{ContextMessage, DispatchAck, RelayRequest, RequestKind};
use slidepilot_core::settings::SettingsStore;
use slidepilot_core::types::ContextId;
use tokio::task::JoinHandle;

use crate::poller::Poller;
use crate::registry::SubscriptionRegistry;

pub struct Dispatcher {
    settings: Arc<SettingsStore>,
    http: reqwest::Client,
    registry: Arc<SubscriptionRegistry>,
    push: Arc<PushChannel>,
    poller: Arc<Poller>,
}

/// How a dispatched request will reach its context.
pub struct Dispatched {
    pub ack: DispatchAck,
    /// Set when a poll loop was started for the job.
    pub poll: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        settings: Arc<SettingsStore>,
        http: reqwest::Client,
        registry: Arc<SubscriptionRegistry>,
        push: Arc<PushChannel>,
        poller: Arc<Poller>,
    ) -> Self {
        Self {
            settings,
            http,
            registry,
            push,
            poller,
        }
    }

    /// Dispatch a request on behalf of `context_id` and return its
    /// acknowledgement.
    pub async fn dispatch(&self, request: &RelayRequest, context_id: &ContextId) -> DispatchAck {
        self.dispatch_tracked(request, context_id).await.ack
    }

    /// Like [`dispatch`](Self::dispatch), also handing back the poll loop
    /// started for the job, if any.
    ///
    /// Backend failures never escape: they become a failed acknowledgement
    /// within this call.
    pub async fn dispatch_tracked(
        &self,
        request: &RelayRequest,
        context_id: &ContextId,
    ) -> Dispatched {
        let kind = request.kind();
        let backend = BackendConfig::resolve(&self.settings).await;
        let api = BackendApi::with_client(self.http.clone(), backend.http_base_url);

        tracing::info!(
            kind = kind.as_str(),
            context_id = %context_id,
            backend = %api.base_url(),
            "Dispatching generation request",
        );

        let outcome = match api.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    context_id = %context_id,
                    failure = %e.kind(),
                    error = %e,
                    "Backend call failed",
                );
                return Dispatched {
                    ack: DispatchAck::failed(e.to_string()),
                    poll: None,
                };
            }
        };

        match outcome {
            GenerateOutcome::Completed(body) => {
                let message = synchronous_result(kind, body);
                if !self.registry.relay(context_id, &message).await {
                    tracing::debug!(context_id = %context_id, "Context gone before result arrived");
                }
                Dispatched {
                    ack: DispatchAck::completed(),
                    poll: None,
                }
            }
            GenerateOutcome::Queued(job_id) => {
                self.registry
                    .subscribe(job_id.clone(), context_id.clone())
                    .await;

                let poll = if self.push.is_connected() {
                    tracing::debug!(job_id = %job_id, "Push channel connected, awaiting job updates");
                    None
                } else {
                    Some(
                        self.poller
                            .start_polling(api, job_id.clone(), context_id.clone()),
                    )
                };

                Dispatched {
                    ack: DispatchAck::accepted(job_id),
                    poll,
                }
            }
            GenerateOutcome::Unrecognized(body) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    response = %body,
                    "Backend response has neither a result nor a job id",
                );
                Dispatched {
                    ack: DispatchAck::failed(format!(
                        "backend response contained neither `{}` nor `job_id`",
                        kind.sync_result_field()
                    )),
                    poll: None,
                }
            }
        }
    }
}

/// Outlines are relayed as `outline-result`; image and presentation
/// results look like a finished job so pages handle them uniformly.
fn synchronous_result(kind: RequestKind, body: serde_json::Value) -> ContextMessage {
    match kind {
        RequestKind::GenerateOutline => ContextMessage::OutlineResult { data: body },
        RequestKind::GenerateImage | RequestKind::GeneratePpt => {
            ContextMessage::job_status(JobStatus::Done, body)
        }
    }
}
