//! Job status vocabulary and helpers for inspecting job payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a backend job.
///
/// The vocabulary is owned by the backend; unknown values are kept
/// verbatim in [`JobStatus::Other`] so they can still be forwarded to
/// page contexts. Only [`Done`](JobStatus::Done) and
/// [`Error`](JobStatus::Error) are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Pending,
    Running,
    Done,
    Error,
    Other(String),
}

impl JobStatus {
    /// Whether no further updates are expected for the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => JobStatus::Queued,
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "done" => JobStatus::Done,
            "error" => JobStatus::Error,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        JobStatus::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the generated image reference from a job payload.
///
/// The backend reports it either nested as `result.image_url` or at the
/// top level as `image_url`; the nested form wins when both are present.
pub fn image_url(job: &serde_json::Value) -> Option<&str> {
    job.get("result")
        .and_then(|r| r.get("image_url"))
        .and_then(|v| v.as_str())
        .or_else(|| job.get("image_url").and_then(|v| v.as_str()))
}
