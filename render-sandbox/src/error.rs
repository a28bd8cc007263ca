//! Error taxonomy for render jobs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

/// Longest stderr excerpt carried in a user-facing message.
const STDERR_EXCERPT_CHARS: usize = 2000;

/// Stable failure kinds, independent of the error message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "WorkspaceCreationError")]
    WorkspaceCreation,
    SandboxUnavailable,
    ExecutionTimeout,
    ScriptExecutionFailed,
    ArtifactNotFound,
    UploadFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::WorkspaceCreation => "WorkspaceCreationError",
            ErrorKind::SandboxUnavailable => "SandboxUnavailable",
            ErrorKind::ExecutionTimeout => "ExecutionTimeout",
            ErrorKind::ScriptExecutionFailed => "ScriptExecutionFailed",
            ErrorKind::ArtifactNotFound => "ArtifactNotFound",
            ErrorKind::UploadFailed => "UploadFailed",
        }
    }

    /// Whether a fresh job with the same input could plausibly succeed.
    ///
    /// Failures caused by the script itself are not worth resubmitting.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::WorkspaceCreation | ErrorKind::SandboxUnavailable | ErrorKind::UploadFailed
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Failed to prepare job workspace: {source}")]
    WorkspaceCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Container runtime unavailable: {0}")]
    SandboxUnavailable(String),

    #[error("Render timed out after {}s", .timeout.as_secs())]
    ExecutionTimeout { timeout: Duration },

    #[error("Script execution failed ({}): {}", describe_exit(.exit_code), excerpt(.stderr))]
    ScriptExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Renderer exited successfully but produced no .{extension} file. Check the scene source.")]
    ArtifactNotFound {
        extension: String,
        searched: PathBuf,
    },

    #[error("Failed to upload artifact: {0}")]
    UploadFailed(String),
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Validation(_) => ErrorKind::Validation,
            RenderError::WorkspaceCreation { .. } => ErrorKind::WorkspaceCreation,
            RenderError::SandboxUnavailable(_) => ErrorKind::SandboxUnavailable,
            RenderError::ExecutionTimeout { .. } => ErrorKind::ExecutionTimeout,
            RenderError::ScriptExecutionFailed { .. } => ErrorKind::ScriptExecutionFailed,
            RenderError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            RenderError::UploadFailed(_) => ErrorKind::UploadFailed,
        }
    }

    pub(crate) fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::WorkspaceCreation {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return "no diagnostic output".to_string();
    }
    tail_chars(trimmed, STDERR_EXCERPT_CHARS).to_string()
}

/// Last `max` characters of `text`, on a char boundary.
pub(crate) fn tail_chars(text: &str, max: usize) -> &str {
    match text.char_indices().rev().nth(max.saturating_sub(1)) {
        Some((idx, _)) if max > 0 => &text[idx..],
        _ if max == 0 => "",
        _ => text,
    }
}
