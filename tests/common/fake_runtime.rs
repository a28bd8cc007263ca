//! Scripted container runtime

use async_trait::async_trait;
use render_sandbox::{
    ContainerRuntime, ExecutionRequest, ExecutionResult, RenderError, Result, MEDIA_DIR,
};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// What the fake container does with a job
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Copy the submitted script into `media/videos/scene/<tier>/<name>.mp4`
    /// and exit 0.
    EchoScript { name: String },
    /// Exit with `code`, writing `stderr`
    Fail { code: i32, stderr: String },
    /// Exit 0 without producing anything
    NoArtifact,
    /// Report a timed out run
    TimedOut,
    /// The engine cannot be driven
    Unavailable(String),
}

/// Everything the fake saw of one run
#[derive(Debug, Clone)]
pub struct ObservedRun {
    pub workspace: PathBuf,
    pub script: String,
    /// Top-level workspace entries at the time the container started
    pub entries: Vec<String>,
    pub quality_flag: &'static str,
}

#[derive(Debug)]
pub struct FakeRuntime {
    behavior: Behavior,
    delay: Duration,
    observed: Mutex<Vec<ObservedRun>>,
}

impl FakeRuntime {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn echo(name: &str) -> Self {
        Self::new(Behavior::EchoScript {
            name: name.to_string(),
        })
    }

    /// Hold each run for `delay` so concurrent jobs overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn observed(&self) -> Vec<ObservedRun> {
        self.observed.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        if let Behavior::Unavailable(reason) = &self.behavior {
            return Err(RenderError::SandboxUnavailable(reason.clone()));
        }

        let script = tokio::fs::read_to_string(request.workspace.join(&request.script))
            .await
            .map_err(|e| RenderError::SandboxUnavailable(format!("script unreadable: {}", e)))?;
        let mut entries: Vec<String> = std::fs::read_dir(&request.workspace)
            .map(|d| {
                d.filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();

        if let Ok(mut observed) = self.observed.lock() {
            observed.push(ObservedRun {
                workspace: request.workspace.clone(),
                script: script.clone(),
                entries,
                quality_flag: request.quality.as_flag(),
            });
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match &self.behavior {
            Behavior::EchoScript { name } => {
                let out = request
                    .workspace
                    .join(MEDIA_DIR)
                    .join("videos/scene")
                    .join(request.quality.as_str());
                let write = async {
                    tokio::fs::create_dir_all(&out).await?;
                    tokio::fs::write(out.join(format!("{}.mp4", name)), &script).await
                };
                write
                    .await
                    .map_err(|e| RenderError::SandboxUnavailable(e.to_string()))?;
                ExecutionResult {
                    exit_code: Some(0),
                    stdout: format!("File ready at {}.mp4", name),
                    stderr: "Manim Community v0.18".to_string(),
                    ..Default::default()
                }
            }
            Behavior::Fail { code, stderr } => ExecutionResult {
                exit_code: Some(*code),
                stderr: stderr.clone(),
                ..Default::default()
            },
            Behavior::NoArtifact => ExecutionResult {
                exit_code: Some(0),
                stdout: "Nothing to render".to_string(),
                ..Default::default()
            },
            Behavior::TimedOut => ExecutionResult {
                exit_code: None,
                timed_out: true,
                duration_ms: request.timeout.as_millis() as u64,
                ..Default::default()
            },
            Behavior::Unavailable(_) => unreachable!("handled above"),
        };
        Ok(result)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
