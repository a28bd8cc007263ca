//! Core types for sandbox execution

use render_common::{JobId, Quality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Request to run one render inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub job_id: JobId,

    /// Absolute host path of the job workspace; the only path mounted
    pub workspace: PathBuf,

    /// Script location relative to the workspace root
    pub script: PathBuf,

    pub quality: Quality,

    /// Hard wall-clock limit
    pub timeout: Duration,
}

impl ExecutionRequest {
    /// Container name derived from the job id, unique per job
    pub fn container_name(&self) -> String {
        format!("render-job-{}", self.job_id.0.simple())
    }

    /// Script path as seen from the container's working directory
    pub fn container_script_path(&self) -> String {
        self.script
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Result of a container run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, `None` when terminated by a signal or killed on timeout
    pub exit_code: Option<i32>,

    pub stdout: String,

    pub stderr: String,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Whether execution hit the wall-clock limit
    pub timed_out: bool,

    /// Whether either stream exceeded the capture cap
    pub truncated: bool,
}

impl ExecutionResult {
    /// Check if execution succeeded. Output on stderr alone is not a failure.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    pub fn logs(&self) -> ExecutionLogs {
        ExecutionLogs {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
        }
    }
}

/// Captured output kept for diagnostics after a job ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogs {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionLogs {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}
