//! Container runtime abstraction
//!
//! The sandbox runner never talks to a container engine directly; it goes
//! through [`ContainerRuntime`], which tests replace with fakes.

mod detect;
mod docker;

use crate::error::Result;
use crate::types::{ExecutionRequest, ExecutionResult};
use async_trait::async_trait;

pub use detect::{probe_engine, EngineStatus};
pub use docker::DockerRuntime;

/// Runs one render in an isolated container bound to a single workspace
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run the request to completion or until its timeout.
    ///
    /// Returns `Err` only when the engine could not be driven at all; script
    /// failures and timeouts are reported through the result.
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;

    /// Get runtime name
    fn name(&self) -> &str;
}
