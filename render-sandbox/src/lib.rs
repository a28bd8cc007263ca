//! Render sandbox - runs untrusted animation scripts in throwaway containers
//!
//! Each job gets a private workspace, a locked-down container that can only
//! see that workspace, and a single uploaded artifact. Workspaces never
//! outlive their job.

mod config;
mod error;
mod job;
mod limits;
mod locator;
mod runner;
mod runtime;
mod script;
mod service;
mod storage;
mod types;
mod workspace;

pub use config::{ConfigError, S3Config, SandboxConfig, StaticCredentials, StorageBackend, StorageConfig};
pub use error::{ErrorKind, RenderError, Result};
pub use job::{Job, JobFailure, JobStage, RenderOutcome};
pub use limits::ResourceLimits;
pub use locator::{Artifact, ArtifactLocator, IGNORED_DIRS};
pub use runner::SandboxRunner;
pub use runtime::{probe_engine, ContainerRuntime, DockerRuntime, EngineStatus};
pub use script::{ScriptPath, ScriptWriter, SCRIPT_FILE_NAME};
pub use service::RenderService;
pub use storage::{
    object_key, sanitize_name, store_from_config, LocalStore, ObjectStore, S3Store,
    StorageUploader, UploadReference,
};
pub use types::{ExecutionLogs, ExecutionRequest, ExecutionResult};
pub use workspace::{Workspace, WorkspaceDir, WorkspaceManager, MEDIA_DIR, SNIPPETS_DIR, WORKSPACE_PREFIX};
