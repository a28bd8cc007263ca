//! Stand-in for the engine CLI, for exercising the real process runtime
//!
//! The script logs its argv, answers `rm` with success and runs the given
//! body for anything else.

use render_sandbox::{DockerRuntime, ResourceLimits};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct FakeEngine {
    _dir: TempDir,
    pub path: PathBuf,
    log: PathBuf,
}

impl FakeEngine {
    pub fn new(run_body: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fake-engine");
        let log = dir.path().join("calls.log");
        let script = format!(
            "#!/bin/sh\n\
             echo \"$*\" >> '{log}'\n\
             if [ \"$1\" = \"rm\" ]; then exit 0; fi\n\
             {run_body}\n",
            log = log.display(),
            run_body = run_body,
        );
        std::fs::write(&path, script).expect("Failed to write fake engine");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake engine executable");
        Self {
            _dir: dir,
            path,
            log,
        }
    }

    /// Never finishes on its own. `exec` so killing the client kills the sleep.
    pub fn hanging() -> Self {
        Self::new("exec sleep 60")
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        Self::new(&format!("echo '{}' >&2\nexit {}", stderr, code))
    }

    /// Each invocation's argument list, in order
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn runtime(&self, limits: ResourceLimits) -> DockerRuntime {
        DockerRuntime::new("render-test-image")
            .with_engine(self.path.to_string_lossy())
            .with_limits(limits)
    }
}
