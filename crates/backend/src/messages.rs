//! Push-channel message types and parser.
//!
//! The backend broadcasts JSON text frames of the shape
//! `{"type": "job-update", "job_id": "...", "status": "...", ...}`.
//! Frames of any other type are recognised but carry nothing the relay
//! acts on.

use slidepilot_core::job::JobStatus;
use slidepilot_core::types::JobId;

/// Message type tag of job status broadcasts.
pub const JOB_UPDATE: &str = "job-update";

/// A parsed push-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// Status change of a backend job.
    JobUpdate(JobUpdate),
    /// Any other message type, ignored by the relay.
    Other { kind: Option<String> },
}

/// Payload of a `job-update` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
    /// The complete frame, forwarded to page contexts as the job payload.
    pub job: serde_json::Value,
}

/// Reasons a push frame could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum PushMessageError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job-update frame is missing `{0}`")]
    MissingField(&'static str),
}

/// Parse a push-channel text frame.
///
/// Returns `Err` for malformed JSON or a `job-update` lacking its job
/// identifier. Callers log the error and keep the channel open. A
/// `job-update` without a status is still forwarded, with an empty
/// non-terminal status.
pub fn parse_message(text: &str) -> Result<PushMessage, PushMessageError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value.get("type").and_then(|t| t.as_str());

    if kind != Some(JOB_UPDATE) {
        return Ok(PushMessage::Other {
            kind: kind.map(str::to_string),
        });
    }

    let job_id = value
        .get("job_id")
        .and_then(JobId::from_json)
        .ok_or(PushMessageError::MissingField("job_id"))?;
    let status = value
        .get("status")
        .and_then(|s| s.as_str())
        .map(JobStatus::from)
        .unwrap_or_else(|| JobStatus::Other(String::new()));

    Ok(PushMessage::JobUpdate(JobUpdate {
        job_id,
        status,
        job: value,
    }))
}
