//! REST client for the generation backend.
//!
//! Wraps the backend HTTP endpoints (generation requests and job status)
//! using [`reqwest`]. Responses are kept as raw JSON and classified here,
//! since the backend is free to add fields.

use slidepilot_core::error::FailureKind;
use slidepilot_core::job::JobStatus;
use slidepilot_core::messages::{RelayRequest, RequestKind};
use slidepilot_core::types::JobId;

/// HTTP client for one backend base URL.
#[derive(Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    base_url: String,
}

/// What a generation endpoint answered.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    /// The result is already in the response body.
    Completed(serde_json::Value),
    /// The backend queued a job; results follow asynchronously.
    Queued(JobId),
    /// Neither a result nor a job identifier.
    Unrecognized(serde_json::Value),
}

/// One observation of a job's state from `GET /api/job-status/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Full response body, forwarded to page contexts as-is.
    pub job: serde_json::Value,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("Malformed backend response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON missing a field the contract requires.
    #[error("Unexpected backend response: {0}")]
    Protocol(String),
}

impl BackendApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BackendApiError::Request(_) | BackendApiError::ApiError { .. } => {
                FailureKind::Transport
            }
            BackendApiError::Parse(_) => FailureKind::Parse,
            BackendApiError::Protocol(_) => FailureKind::Protocol,
        }
    }
}

impl BackendApi {
    /// Create a new API client for a backend.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://localhost:9000`.
    pub fn new(base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`], so
    /// every request shares one connection pool even when the base URL
    /// changes between requests.
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a generation request to its endpoint and classify the answer.
    pub async fn generate(
        &self,
        request: &RelayRequest,
    ) -> Result<GenerateOutcome, BackendApiError> {
        let kind = request.kind();
        let response = self
            .client
            .post(format!("{}{}", self.base_url, kind.endpoint()))
            .json(request)
            .send()
            .await?;

        let body = Self::parse_response(response).await?;
        Ok(classify(kind, body))
    }

    /// Fetch the current status of a job.
    ///
    /// Sends `GET /api/job-status/{job_id}`. The body must carry a string
    /// `status` field; everything else is passed through.
    pub async fn job_status(&self, job_id: &JobId) -> Result<JobSnapshot, BackendApiError> {
        let response = self
            .client
            .get(format!("{}/api/job-status/{}", self.base_url, job_id))
            .send()
            .await?;

        let job = Self::parse_response(response).await?;
        let status = job
            .get("status")
            .and_then(|s| s.as_str())
            .map(JobStatus::from)
            .ok_or_else(|| {
                BackendApiError::Protocol(format!("job-status for {job_id} has no status field"))
            })?;

        Ok(JobSnapshot { status, job })
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`BackendApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read a successful response body as JSON.
    ///
    /// The body is read as text first so that a malformed payload surfaces
    /// as [`BackendApiError::Parse`] rather than a transport error.
    async fn parse_response(
        response: reqwest::Response,
    ) -> Result<serde_json::Value, BackendApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Decide whether a generation response is a synchronous result, a queued
/// job, or neither. A synchronous result wins over a job identifier.
pub fn classify(kind: RequestKind, body: serde_json::Value) -> GenerateOutcome {
    let has_result = body
        .get(kind.sync_result_field())
        .is_some_and(|v| !v.is_null());
    if has_result {
        return GenerateOutcome::Completed(body);
    }

    match body.get("job_id").and_then(JobId::from_json) {
        Some(job_id) => GenerateOutcome::Queued(job_id),
        None => GenerateOutcome::Unrecognized(body),
    }
}
