//! Render job orchestration
//!
//! [`RenderService`] wires the stages together: acquire a workspace, write the
//! script, run the container, find the artifact, upload it. The workspace is
//! released on every path before the job reports back.

use crate::config::SandboxConfig;
use crate::error::{RenderError, Result};
use crate::job::{Job, JobFailure, JobStage, RenderOutcome};
use crate::locator::{Artifact, ArtifactLocator};
use crate::runner::SandboxRunner;
use crate::runtime::{ContainerRuntime, DockerRuntime};
use crate::script::ScriptWriter;
use crate::storage::{store_from_config, ObjectStore, StorageUploader, UploadReference};
use crate::types::ExecutionRequest;
use crate::workspace::{WorkspaceDir, WorkspaceManager};
use render_common::{Quality, RenderJobRequest};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Clone)]
pub struct RenderService {
    workspaces: WorkspaceManager,
    scripts: ScriptWriter,
    runner: SandboxRunner,
    locator: ArtifactLocator,
    uploader: StorageUploader,
    default_timeout: Duration,
    admission: Option<Arc<Semaphore>>,
}

impl RenderService {
    pub fn new(
        config: &SandboxConfig,
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            workspaces: WorkspaceManager::new(&config.jobs_root),
            scripts: ScriptWriter::new(),
            runner: SandboxRunner::new(runtime),
            locator: ArtifactLocator::new(config.artifact_extension.clone()),
            uploader: StorageUploader::new(store).with_key_prefix(config.storage.key_prefix.clone()),
            default_timeout: config.limits.max_duration,
            admission: config
                .max_concurrent_jobs
                .map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Production wiring: the engine CLI runtime and the configured store.
    pub async fn from_config(config: &SandboxConfig) -> Self {
        let runtime = Arc::new(DockerRuntime::from_config(config));
        let store = store_from_config(&config.storage).await;
        Self::new(config, runtime, store)
    }

    pub fn runtime_name(&self) -> &str {
        self.runner.runtime_name()
    }

    pub fn jobs_root(&self) -> &Path {
        self.workspaces.root()
    }

    /// Run one validated request end to end.
    pub async fn render(
        &self,
        request: RenderJobRequest,
    ) -> std::result::Result<RenderOutcome, JobFailure> {
        let job = Job::new(request.quality);
        let span = info_span!("render_job", job_id = %job.id(), quality = %request.quality);
        self.run_job(job, request).instrument(span).await
    }

    async fn run_job(
        &self,
        mut job: Job,
        request: RenderJobRequest,
    ) -> std::result::Result<RenderOutcome, JobFailure> {
        let _permit = match &self.admission {
            Some(semaphore) => match semaphore.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    return Err(job.fail(RenderError::SandboxUnavailable(
                        "render service is shutting down".to_string(),
                    )))
                }
            },
            None => None,
        };

        let timeout = request.timeout.unwrap_or(self.default_timeout);
        info!(
            code_bytes = request.code.len(),
            timeout_secs = timeout.as_secs(),
            "Render job accepted"
        );

        let code = request.code;
        let quality = request.quality;
        let job_ref = &mut job;
        let staged = self
            .workspaces
            .with_workspace(move |dir| async move {
                self.run_stages(job_ref, &dir, &code, quality, timeout).await
            })
            .await;

        match staged {
            Ok(Ok((reference, artifact))) => Ok(job.complete(reference, artifact)),
            Ok(Err(error)) | Err(error) => Err(job.fail(error)),
        }
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        dir: &WorkspaceDir,
        code: &str,
        quality: Quality,
        timeout: Duration,
    ) -> Result<(UploadReference, Artifact)> {
        job.advance(JobStage::WorkspaceAcquired);

        let script = self.scripts.write(dir, code).await?;
        job.advance(JobStage::ScriptWritten);

        let request = ExecutionRequest {
            job_id: job.id(),
            workspace: dir.path().to_path_buf(),
            script: script.relative,
            quality,
            timeout,
        };
        let result = self.runner.run(&request).await?;
        job.record_logs(result.logs());
        SandboxRunner::check(&request, &result)?;
        job.advance(JobStage::Executed);

        let artifact = self.locator.locate(dir).await?;
        info!(artifact = %artifact.name, bytes = artifact.size_bytes, "Artifact located");
        job.advance(JobStage::ArtifactLocated);

        let reference = self.uploader.upload(&artifact).await?;
        job.advance(JobStage::Uploaded);

        Ok((reference, artifact))
    }
}
