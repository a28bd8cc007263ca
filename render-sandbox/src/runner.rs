//! Runs a written script through the container runtime and classifies the
//! outcome

use crate::error::{RenderError, Result};
use crate::runtime::ContainerRuntime;
use crate::types::{ExecutionRequest, ExecutionResult};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SandboxRunner {
    runtime: Arc<dyn ContainerRuntime>,
}

impl std::fmt::Debug for SandboxRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxRunner")
            .field("runtime", &self.runtime.name())
            .finish()
    }
}

impl SandboxRunner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Run without judging the result. Fails only when the engine itself
    /// is unusable.
    pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let result = self.runtime.run(request).await?;
        debug!(
            exit_code = ?result.exit_code,
            duration_ms = result.duration_ms,
            timed_out = result.timed_out,
            truncated = result.truncated,
            "Container finished"
        );
        if result.truncated {
            warn!("Container output exceeded the capture cap, kept the tail");
        }
        Ok(result)
    }

    /// Turn a timed out or failed run into the matching error.
    pub fn check(request: &ExecutionRequest, result: &ExecutionResult) -> Result<()> {
        if result.timed_out {
            return Err(RenderError::ExecutionTimeout {
                timeout: request.timeout,
            });
        }
        if !result.success() {
            // Some renderers report tracebacks on stdout only.
            let diagnostics = if result.stderr.trim().is_empty() {
                result.stdout.clone()
            } else {
                result.stderr.clone()
            };
            return Err(RenderError::ScriptExecutionFailed {
                exit_code: result.exit_code,
                stderr: diagnostics,
            });
        }
        Ok(())
    }

    /// `run` followed by `check`.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let result = self.run(request).await?;
        Self::check(request, &result)?;
        Ok(result)
    }
}
