//! Render job lifecycle
//!
//! A job moves through [`JobStage`]s strictly in order. Failing consumes the
//! [`Job`], so no transition can follow a failure.

use crate::error::{ErrorKind, RenderError};
use crate::locator::Artifact;
use crate::storage::UploadReference;
use crate::types::ExecutionLogs;
use render_common::{JobId, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobStage {
    Validated,
    WorkspaceAcquired,
    ScriptWritten,
    Executed,
    ArtifactLocated,
    Uploaded,
    Done,
}

impl JobStage {
    pub fn next(self) -> Option<JobStage> {
        match self {
            JobStage::Validated => Some(JobStage::WorkspaceAcquired),
            JobStage::WorkspaceAcquired => Some(JobStage::ScriptWritten),
            JobStage::ScriptWritten => Some(JobStage::Executed),
            JobStage::Executed => Some(JobStage::ArtifactLocated),
            JobStage::ArtifactLocated => Some(JobStage::Uploaded),
            JobStage::Uploaded => Some(JobStage::Done),
            JobStage::Done => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Validated => "validated",
            JobStage::WorkspaceAcquired => "workspace_acquired",
            JobStage::ScriptWritten => "script_written",
            JobStage::Executed => "executed",
            JobStage::ArtifactLocated => "artifact_located",
            JobStage::Uploaded => "uploaded",
            JobStage::Done => "done",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight job state owned by the orchestrator
#[derive(Debug)]
pub struct Job {
    id: JobId,
    quality: Quality,
    stage: JobStage,
    logs: Option<ExecutionLogs>,
    started: Instant,
}

impl Job {
    /// A job whose request already passed validation
    pub fn new(quality: Quality) -> Self {
        Self {
            id: JobId::new(),
            quality,
            stage: JobStage::Validated,
            logs: None,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Move to `to`, which must be the stage after the current one.
    pub fn advance(&mut self, to: JobStage) {
        debug_assert_eq!(
            self.stage.next(),
            Some(to),
            "out of order transition {} -> {}",
            self.stage,
            to
        );
        if self.stage.next() != Some(to) {
            warn!(from = %self.stage, to = %to, "Out of order job transition");
        }
        debug!(from = %self.stage, to = %to, "Job stage");
        self.stage = to;
    }

    /// Keep container output for the final report.
    pub fn record_logs(&mut self, logs: ExecutionLogs) {
        self.logs = Some(logs);
    }

    pub fn complete(mut self, reference: UploadReference, artifact: Artifact) -> RenderOutcome {
        self.advance(JobStage::Done);
        let duration = self.elapsed();
        info!(
            key = %reference.key,
            duration_ms = duration.as_millis() as u64,
            "Render job finished"
        );
        RenderOutcome {
            job_id: self.id,
            quality: self.quality,
            reference,
            artifact,
            logs: self.logs.unwrap_or_default(),
            duration,
        }
    }

    pub fn fail(self, error: RenderError) -> JobFailure {
        let duration = self.elapsed();
        warn!(
            kind = %error.kind(),
            stage = %self.stage,
            duration_ms = duration.as_millis() as u64,
            error = %error,
            "Render job failed"
        );
        JobFailure {
            job_id: self.id,
            stage: self.stage,
            error,
            logs: self.logs,
            duration,
        }
    }
}

/// A finished job
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub job_id: JobId,
    pub quality: Quality,
    pub reference: UploadReference,
    pub artifact: Artifact,
    pub logs: ExecutionLogs,
    pub duration: Duration,
}

/// A failed job with everything known at the time of failure
#[derive(Debug, Error)]
#[error("job {job_id} failed after stage {stage}: {error}")]
pub struct JobFailure {
    pub job_id: JobId,
    /// Last stage reached successfully
    pub stage: JobStage,
    #[source]
    pub error: RenderError,
    /// Container output, when the container ran
    pub logs: Option<ExecutionLogs>,
    pub duration: Duration,
}

impl JobFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// User-facing description without job bookkeeping
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
