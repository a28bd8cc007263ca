//! Docker/Podman CLI runtime
//!
//! The engine binary is spawned directly with a structured argument list.
//! Nothing goes through a shell, so neither the workspace path nor the image
//! name can inject extra arguments.

use super::ContainerRuntime;
use crate::config::SandboxConfig;
use crate::error::{tail_chars, RenderError, Result};
use crate::limits::ResourceLimits;
use crate::types::{ExecutionRequest, ExecutionResult};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Exit code the docker and podman CLIs use for their own failures. A script
/// can exit with it too, so it only counts together with an engine message.
const ENGINE_ERROR_EXIT_CODE: i32 = 125;
/// Line prefixes the engine CLIs put on their own error output
const ENGINE_ERROR_PREFIXES: &[&str] = &["docker: ", "Error: "];
/// Daemon-side failures, possibly wrapped by the client
const DAEMON_ERROR_MARKER: &str = "Error response from daemon";
/// Renderer invocation inside the image, followed by script path and quality
const RENDER_COMMAND: &[&str] = &["manim", "render"];
/// How long to wait for output readers once the process is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for the forced container removal after a timeout
const REMOVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Container runtime driving the `docker` (or compatible) CLI
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    engine: String,
    image: String,
    mount_point: String,
    limits: ResourceLimits,
    match_workspace_owner: bool,
}

impl DockerRuntime {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            engine: "docker".to_string(),
            image: image.into(),
            mount_point: "/manim".to_string(),
            limits: ResourceLimits::default(),
            match_workspace_owner: true,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.image.clone())
            .with_engine(config.engine.clone())
            .with_limits(config.limits.clone())
            .with_workspace_owner(config.match_workspace_owner)
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run the container as the uid:gid owning the workspace, so files the
    /// renderer creates stay removable by the host.
    pub fn with_workspace_owner(mut self, enabled: bool) -> Self {
        self.match_workspace_owner = enabled;
        self
    }

    /// Full argument list passed to the engine binary
    pub fn build_args(&self, request: &ExecutionRequest, user: Option<&str>) -> Result<Vec<String>> {
        let source = request.workspace.to_str().ok_or_else(|| {
            RenderError::SandboxUnavailable("workspace path is not valid UTF-8".to_string())
        })?;
        if !request.workspace.is_absolute() || source.contains(',') {
            return Err(RenderError::SandboxUnavailable(format!(
                "workspace path cannot be bind-mounted: {}",
                source
            )));
        }

        let mut args: Vec<String> = [
            "run",
            "--rm",
            "--name",
            &request.container_name(),
            "--network",
            "none",
            "--cap-drop",
            "ALL",
            "--security-opt",
            "no-new-privileges",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(self.limits.container_args());

        if let Some(user) = user {
            args.push("--user".to_string());
            args.push(user.to_string());
        }

        args.push("--mount".to_string());
        args.push(format!(
            "type=bind,source={},target={}",
            source, self.mount_point
        ));
        args.push("--workdir".to_string());
        args.push(self.mount_point.clone());

        args.push(self.image.clone());
        args.extend(RENDER_COMMAND.iter().map(|s| s.to_string()));
        args.push(request.container_script_path());
        args.push(request.quality.as_flag().to_string());
        Ok(args)
    }

    async fn force_remove(&self, container: &str) {
        let removal = Command::new(&self.engine)
            .args(["rm", "--force", container])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(REMOVE_TIMEOUT, removal).await {
            Ok(Ok(status)) if status.success() => {
                debug!(container = %container, "Container removed");
            }
            Ok(Ok(status)) => {
                warn!(container = %container, ?status, "Container removal reported failure");
            }
            Ok(Err(e)) => warn!(container = %container, error = %e, "Failed to run container removal"),
            Err(_) => warn!(container = %container, "Container removal timed out"),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let user = if self.match_workspace_owner {
            workspace_owner(&request.workspace).await
        } else {
            None
        };
        let args = self.build_args(request, user.as_deref())?;
        let container = request.container_name();

        debug!(
            engine = %self.engine,
            container = %container,
            image = %self.image,
            "Launching container"
        );

        let start = Instant::now();
        let mut child = Command::new(&self.engine)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RenderError::SandboxUnavailable(format!(
                    "failed to launch '{}': {}",
                    self.engine, e
                ))
            })?;
        let mut guard = ContainerGuard::new(&self.engine, &container);

        let limit = self.limits.max_output_bytes;
        let stdout_task = child.stdout.take().map(|out| tokio::spawn(capture(out, limit)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(capture(err, limit)));

        let (exit_code, timed_out) =
            match tokio::time::timeout(request.timeout, child.wait()).await {
                Ok(Ok(status)) => (status.code(), false),
                Ok(Err(e)) => {
                    return Err(RenderError::SandboxUnavailable(format!(
                        "lost track of '{}' process: {}",
                        self.engine, e
                    )));
                }
                Err(_) => {
                    warn!(
                        container = %container,
                        timeout_secs = request.timeout.as_secs(),
                        "Render timed out, killing container"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(container = %container, error = %e, "Failed to kill engine client");
                    }
                    self.force_remove(&container).await;
                    (None, true)
                }
            };
        guard.disarm();

        let stdout = drain(stdout_task).await;
        let stderr = drain(stderr_task).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if !timed_out
            && exit_code == Some(ENGINE_ERROR_EXIT_CODE)
            && is_engine_error(&stderr.text)
        {
            return Err(RenderError::SandboxUnavailable(format!(
                "{} could not start the container: {}",
                self.engine,
                tail_chars(stderr.text.trim(), 500)
            )));
        }

        Ok(ExecutionResult {
            exit_code,
            stdout: stdout.text,
            stderr: stderr.text,
            duration_ms,
            timed_out,
            truncated: stdout.truncated || stderr.truncated,
        })
    }

    fn name(&self) -> &str {
        &self.engine
    }
}

/// Force-removes the named container if the run is abandoned midway.
struct ContainerGuard {
    engine: String,
    container: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(engine: &str, container: &str) -> Self {
        Self {
            engine: engine.to_string(),
            container: container.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(container = %self.container, "Container run abandoned, removing container");
        let args = ["rm", "--force", self.container.as_str()];
        let spawned = if tokio::runtime::Handle::try_current().is_ok() {
            Command::new(&self.engine)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(|_| ())
        } else {
            std::process::Command::new(&self.engine)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(|_| ())
        };
        if let Err(e) = spawned {
            warn!(container = %self.container, error = %e, "Failed to spawn container removal");
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    text: String,
    truncated: bool,
}

/// Read a stream to the end, keeping at most `limit` trailing bytes.
async fn capture<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    // Trim lazily so a flood of output costs amortized linear time.
    let high_water = limit.saturating_mul(2).max(limit + chunk.len());

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > high_water {
                    let excess = buf.len() - limit;
                    buf.drain(..excess);
                    truncated = true;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed reading container output");
                break;
            }
        }
    }

    if buf.len() > limit {
        let excess = buf.len() - limit;
        buf.drain(..excess);
        truncated = true;
    }

    Captured {
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated,
    }
}

async fn drain(task: Option<JoinHandle<Captured>>) -> Captured {
    let Some(mut handle) = task else {
        return Captured::default();
    };
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut handle).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(e)) => {
            warn!(error = %e, "Output reader task failed");
            Captured::default()
        }
        Err(_) => {
            handle.abort();
            warn!("Output reader did not finish, discarding output");
            Captured::default()
        }
    }
}

/// Whether the captured stderr carries the engine CLI's own error report
/// rather than output from the script.
fn is_engine_error(stderr: &str) -> bool {
    stderr.lines().any(|line| {
        line.contains(DAEMON_ERROR_MARKER)
            || ENGINE_ERROR_PREFIXES
                .iter()
                .any(|prefix| line.starts_with(prefix))
    })
}

#[cfg(unix)]
async fn workspace_owner(path: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(format!("{}:{}", meta.uid(), meta.gid()))
}

#[cfg(not(unix))]
async fn workspace_owner(_path: &Path) -> Option<String> {
    None
}
