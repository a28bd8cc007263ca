//! Request and response bodies for the render API

use crate::quality::Quality;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Unique render job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound body of `POST /api/render`.
///
/// Fields are kept loosely typed so that every problem is reported through
/// [`ValidationErrors`] instead of a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RenderRequest {
    /// Source of the scene to render
    #[serde(rename = "codeContent", default)]
    #[validate(custom(function = "validate_code_content"))]
    pub code_content: String,

    /// Optional quality tier code (`-ql`, `-qm`, `-qh`, `-qp`, `-qk`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_quality"))]
    pub quality: Option<String>,
}

impl RenderRequest {
    pub fn new(code_content: impl Into<String>) -> Self {
        Self {
            code_content: code_content.into(),
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Validate and normalize into a job request.
    pub fn into_job_request(self) -> Result<RenderJobRequest, ValidationErrors> {
        self.validate().map_err(wire_field_names)?;
        let quality = match self.quality.as_deref() {
            Some(code) => code.parse().map_err(|_| quality_errors(code))?,
            None => Quality::default(),
        };
        Ok(RenderJobRequest {
            code: self.code_content,
            quality,
            timeout: None,
        })
    }
}

fn validate_code_content(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        return Err(ValidationError::new("blank")
            .with_message(Cow::Borrowed("Code content cannot be empty.")));
    }
    Ok(())
}

fn validate_quality(code: &str) -> Result<(), ValidationError> {
    code.parse::<Quality>().map(|_| ()).map_err(|err| {
        ValidationError::new("quality").with_message(Cow::Owned(err.to_string()))
    })
}

/// Key field errors by the JSON field names clients send.
fn wire_field_names(errors: ValidationErrors) -> ValidationErrors {
    let mut renamed = ValidationErrors::new();
    for (field, field_errors) in errors.field_errors() {
        let name = match &*field {
            "code_content" | "codeContent" => "codeContent",
            "quality" => "quality",
            _ => continue,
        };
        for error in field_errors {
            renamed.add(name, error.clone());
        }
    }
    renamed
}

fn quality_errors(code: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if let Err(err) = validate_quality(code) {
        errors.add("quality", err);
    }
    errors
}

/// Normalized job request handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJobRequest {
    /// Untrusted scene source, written verbatim into the workspace
    pub code: String,

    pub quality: Quality,

    /// Per-job override of the configured execution timeout
    pub timeout: Option<Duration>,
}

impl RenderJobRequest {
    pub fn new(code: impl Into<String>, quality: Quality) -> Self {
        Self {
            code: code.into(),
            quality,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Message sent with every successful render
pub const RENDER_SUCCESS_MESSAGE: &str = "Video created successfully.";

/// Successful render response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub message: String,
    /// Durable object key of the uploaded artifact
    pub artifact_key: String,
    /// Human-readable location of the artifact (`s3://...`, `file://...`)
    pub artifact_uri: String,
    /// Same location as `artifact_uri`, under the field name older
    /// `/generate` callers read
    pub video_url: String,
    pub job_id: JobId,
}

impl RenderResponse {
    pub fn success(artifact_key: String, artifact_uri: String, job_id: JobId) -> Self {
        Self {
            message: RENDER_SUCCESS_MESSAGE.to_string(),
            artifact_key,
            video_url: artifact_uri.clone(),
            artifact_uri,
            job_id,
        }
    }
}

/// Body returned for rejected requests (400)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub message: String,
    pub errors: serde_json::Value,
}

impl ValidationErrorResponse {
    pub fn new(errors: serde_json::Value) -> Self {
        Self {
            message: "Invalid request".to_string(),
            errors,
        }
    }
}

/// Body returned for failed jobs (5xx)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    /// Stable failure kind (`ScriptExecutionFailed`, `UploadFailed`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

/// Liveness response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            message: "Health is OK".to_string(),
        }
    }
}
