//! In-memory job store and the job lifecycle simulation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use slidepilot_core::job::JobStatus;
use slidepilot_core::messages::RequestKind;
use slidepilot_core::types::JobId;
use tokio::sync::{broadcast, RwLock};

/// Buffered push frames per subscriber before it starts lagging.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Slide count when an outline request does not ask for one.
const DEFAULT_OUTLINE_LENGTH: u64 = 3;

#[derive(Debug, Clone)]
pub struct MockJob {
    pub kind: RequestKind,
    pub status: JobStatus,
    pub payload: Value,
    pub result: Option<Value>,
}

pub struct JobStore {
    jobs: RwLock<HashMap<JobId, MockJob>>,
    updates: broadcast::Sender<String>,
    step_delay: Duration,
}

impl JobStore {
    pub fn new(step_delay: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            updates,
            step_delay,
        }
    }

    /// Record a queued job and start processing it in the background.
    pub async fn enqueue(self: &Arc<Self>, kind: RequestKind, payload: Value) -> JobId {
        let job_id = JobId::new(uuid::Uuid::new_v4().to_string());
        self.jobs.write().await.insert(
            job_id.clone(),
            MockJob {
                kind,
                status: JobStatus::Queued,
                payload,
                result: None,
            },
        );
        tracing::info!(job_id = %job_id, kind = kind.as_str(), "Job queued");

        let store = Arc::clone(self);
        let id = job_id.clone();
        tokio::spawn(async move { store.process(id).await });

        job_id
    }

    /// Receive every `job-update` frame broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.updates.subscribe()
    }

    pub async fn get(&self, job_id: &JobId) -> Option<MockJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Body of `GET /api/job-status/{id}`.
    pub async fn status_body(&self, job_id: &JobId) -> Value {
        match self.get(job_id).await {
            Some(job) => json!({
                "job_id": job_id,
                "status": job.status,
                "result": job.result,
            }),
            None => json!({"job_id": job_id, "status": "not_found"}),
        }
    }

    async fn process(&self, job_id: JobId) {
        if !self.set_status(&job_id, JobStatus::Running, None).await {
            return;
        }
        self.broadcast(json!({
            "type": "job-update",
            "job_id": job_id,
            "status": JobStatus::Running,
        }));

        tokio::time::sleep(self.step_delay).await;

        let Some(job) = self.get(&job_id).await else {
            return;
        };
        let result = build_result(&job_id, job.kind, &job.payload);
        self.set_status(&job_id, JobStatus::Done, Some(result.clone()))
            .await;
        tracing::info!(job_id = %job_id, "Job done");

        self.broadcast(json!({
            "type": "job-update",
            "job_id": job_id,
            "status": JobStatus::Done,
            "result": result,
        }));
    }

    async fn set_status(&self, job_id: &JobId, status: JobStatus, result: Option<Value>) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) => {
                job.status = status;
                if result.is_some() {
                    job.result = result;
                }
                true
            }
            None => false,
        }
    }

    fn broadcast(&self, frame: Value) {
        // No receivers is fine: nobody is listening on /ws.
        let receivers = self.updates.send(frame.to_string()).unwrap_or(0);
        tracing::debug!(receivers, "Broadcast job update");
    }
}

fn build_result(job_id: &JobId, kind: RequestKind, payload: &Value) -> Value {
    match kind {
        RequestKind::GenerateOutline => {
            let length = payload
                .get("length")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_OUTLINE_LENGTH);
            let title = payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Sample");
            let slides: Vec<Value> = (1..=length)
                .map(|i| {
                    json!({
                        "title": format!("{title} - page {i}"),
                        "bullets": ["Sample point 1", "Sample point 2"],
                    })
                })
                .collect();
            json!({ "slides": slides })
        }
        RequestKind::GenerateImage => {
            json!({ "image_url": format!("file:///tmp/mock_images/{job_id}.png") })
        }
        RequestKind::GeneratePpt => {
            json!({ "ppt_url": format!("file:///tmp/mock_ppts/{job_id}.pptx") })
        }
    }
}
