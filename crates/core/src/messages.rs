//! Wire protocol between page contexts and the relay.
//!
//! Page contexts send a [`RelayEnvelope`] as a JSON text frame:
//!
//! ```json
//! {"type": "generate-outline", "request_id": "r1",
//!  "payload": {"title": "X", "audience": "", "length": 5, "style": "default"}}
//! ```
//!
//! The relay answers every envelope with a [`ContextMessage::Ack`] and later
//! pushes [`ContextMessage::OutlineResult`] / [`ContextMessage::JobStatus`]
//! notifications as results become available.

use serde::{Deserialize, Serialize};

use crate::job::{self, JobStatus};
use crate::types::JobId;

// ---------------------------------------------------------------------------
// Inbound (page -> relay)
// ---------------------------------------------------------------------------

/// The generation request types a page context may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    GenerateOutline,
    GenerateImage,
    GeneratePpt,
}

impl RequestKind {
    /// Backend path the request is POSTed to.
    pub fn endpoint(self) -> &'static str {
        match self {
            RequestKind::GenerateOutline => "/api/generate-outline",
            RequestKind::GenerateImage => "/api/generate-image",
            RequestKind::GeneratePpt => "/api/generate-ppt",
        }
    }

    /// Response field whose presence marks a synchronous result.
    pub fn sync_result_field(self) -> &'static str {
        match self {
            RequestKind::GenerateOutline => "slides",
            RequestKind::GenerateImage => "image_url",
            RequestKind::GeneratePpt => "ppt_url",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::GenerateOutline => "generate-outline",
            RequestKind::GenerateImage => "generate-image",
            RequestKind::GeneratePpt => "generate-ppt",
        }
    }
}

/// Raw inbound frame before the payload is checked against its type.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayEnvelope {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Echoed back in the acknowledgement so the page can correlate it.
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RelayEnvelope {
    /// Parse a text frame received from a page context.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validate the payload against the request type.
    pub fn into_request(self) -> Result<RelayRequest, serde_json::Error> {
        let request = match self.kind {
            RequestKind::GenerateOutline => {
                RelayRequest::GenerateOutline(serde_json::from_value(self.payload)?)
            }
            RequestKind::GenerateImage => {
                RelayRequest::GenerateImage(serde_json::from_value(self.payload)?)
            }
            RequestKind::GeneratePpt => {
                RelayRequest::GeneratePpt(serde_json::from_value(self.payload)?)
            }
        };
        Ok(request)
    }
}

/// A typed generation request.
///
/// Serializes to the bare payload, which is exactly the body the backend
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayRequest {
    GenerateOutline(OutlineRequest),
    GenerateImage(ImageRequest),
    GeneratePpt(PptRequest),
}

impl RelayRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            RelayRequest::GenerateOutline(_) => RequestKind::GenerateOutline,
            RelayRequest::GenerateImage(_) => RequestKind::GenerateImage,
            RelayRequest::GeneratePpt(_) => RequestKind::GeneratePpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    /// Pixel dimensions such as `800x600`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Assemble a presentation from a previously generated outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PptRequest {
    pub outline_id: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// Places the output of an image job on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub slide: u32,
    pub image_job: JobId,
}

// ---------------------------------------------------------------------------
// Outbound (relay -> page)
// ---------------------------------------------------------------------------

/// Immediate answer to a dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchAck {
    /// Synchronous result already relayed; nothing to wait for.
    pub fn completed() -> Self {
        Self {
            request_id: None,
            ok: true,
            job_id: None,
            error: None,
        }
    }

    /// Job accepted; results follow as `job-status` notifications.
    pub fn accepted(job_id: JobId) -> Self {
        Self {
            request_id: None,
            ok: true,
            job_id: Some(job_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            request_id: None,
            ok: false,
            job_id: None,
            error: Some(error.into()),
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Any frame the relay sends to a page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContextMessage {
    /// Answer to a [`RelayEnvelope`].
    Ack(DispatchAck),

    /// A synchronously generated outline (the full backend response).
    OutlineResult { data: serde_json::Value },

    /// Progress or completion of an asynchronous job.
    JobStatus {
        status: JobStatus,
        job: serde_json::Value,
        /// Image reference lifted out of `job`, if the job produced one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
}

impl ContextMessage {
    /// Build a `job-status` notification, lifting out any image reference.
    pub fn job_status(status: JobStatus, job: serde_json::Value) -> Self {
        let image_url = job::image_url(&job).map(str::to_string);
        ContextMessage::JobStatus {
            status,
            job,
            image_url,
        }
    }

    /// Serialize into a text frame. `None` (logged) if serialization fails.
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize context message");
                None
            }
        }
    }
}
